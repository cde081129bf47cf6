//! Shared HTTP plumbing: client construction, safe URL logging and error-body
//! normalization for both the intranet API and object storage.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use url::Url;

use crate::config::BackendConfig;
use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Query parameter keys (case-insensitive) that should have their values redacted.
///
/// Pre-signed storage URLs carry their credentials in the query string.
const SENSITIVE_QUERY_PARAMS: &[&str] = &[
    "x-amz-signature",
    "x-amz-credential",
    "x-amz-security-token",
    "signature",
    "awsaccesskeyid",
    "token",
    "api_token",
    "access_token",
];

/// Longest plain-text error body surfaced to the user as-is.
const MAX_PLAIN_ERROR_LEN: usize = 300;

// ─────────────────────────────────────────────────────────────────────────────
// LoggingMode
// ─────────────────────────────────────────────────────────────────────────────

/// Controls how URLs are sanitized for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoggingMode {
    /// Log only the path component. Strips scheme, host, query, and fragment.
    /// Example: `/api/datacredito/estado`
    #[default]
    PathOnly,

    /// Log path and query parameters, but redact sensitive values.
    /// Example: `/bucket/in/a.txt?X-Amz-Signature=***&X-Amz-Expires=900`
    PathAndQueryRedacted,
}

// ─────────────────────────────────────────────────────────────────────────────
// URL Sanitization
// ─────────────────────────────────────────────────────────────────────────────

/// Determines if a query parameter key is sensitive and should be redacted.
fn is_sensitive_param(key: &str) -> bool {
    let key_lower = key.to_ascii_lowercase();
    SENSITIVE_QUERY_PARAMS
        .iter()
        .any(|&sensitive| key_lower == sensitive)
}

/// Sanitizes a URL for safe logging based on the specified mode.
///
/// The result never contains the scheme, host, or fragment.
pub fn sanitize_url_for_logs(url: &Url, mode: LoggingMode) -> String {
    let path = url.path();

    match mode {
        LoggingMode::PathOnly => path.to_string(),
        LoggingMode::PathAndQueryRedacted => {
            let query_pairs: Vec<_> = url.query_pairs().collect();
            if query_pairs.is_empty() {
                return path.to_string();
            }

            let redacted_pairs: Vec<String> = query_pairs
                .into_iter()
                .map(|(key, value)| {
                    if is_sensitive_param(&key) {
                        format!("{}=***", key)
                    } else {
                        format!("{}={}", key, value)
                    }
                })
                .collect();

            format!("{}?{}", path, redacted_pairs.join("&"))
        }
    }
}

/// Same as [`sanitize_url_for_logs`] for URLs that arrive as strings.
pub(crate) fn sanitize_str_for_logs(raw: &str, mode: LoggingMode) -> String {
    match Url::parse(raw) {
        Ok(url) => sanitize_url_for_logs(&url, mode),
        Err(_) => "<invalid url>".to_string(),
    }
}

/// Redacts a job key for logging (shows first 8 chars).
pub(crate) fn redact_key(key: &str) -> String {
    match key.char_indices().nth(8) {
        Some((idx, _)) => format!("{}...", &key[..idx]),
        None => key.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP client
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the configured HTTP client shared by the API and storage clients.
pub fn build_http_client(config: &BackendConfig) -> Result<reqwest::Client, AppError> {
    let mut headers = HeaderMap::new();
    let agent = HeaderValue::from_str(&config.user_agent)
        .map_err(|_| AppError::Config("backend.user_agent is not a valid header".to_string()))?;
    headers.insert(USER_AGENT, agent);

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// Parses the API root, making sure relative joins append to it.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let mut url = Url::parse(raw)
        .map_err(|e| AppError::Config(format!("Invalid backend URL: {}", e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// ─────────────────────────────────────────────────────────────────────────────
// Error normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Picks the most useful human-readable message out of an error body.
///
/// Understands the usual Laravel shapes (`message`, `error`, `detail`, and the
/// validation `errors` map) and short plain-text bodies. HTML pages are ignored.
pub(crate) fn extract_backend_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        // Validation errors are more specific than the generic message
        if let Some(errors) = json.get("errors").and_then(|v| v.as_object()) {
            let first = errors.values().find_map(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Array(items) => {
                    items.iter().find_map(|i| i.as_str().map(str::to_string))
                }
                _ => None,
            });
            if first.is_some() {
                return first;
            }
        }

        for field in ["message", "error", "detail", "mensaje"] {
            if let Some(msg) = json.get(field).and_then(|v| v.as_str()) {
                if !msg.trim().is_empty() {
                    return Some(msg.trim().to_string());
                }
            }
        }
        return None;
    }

    if trimmed.starts_with('<') || trimmed.len() > MAX_PLAIN_ERROR_LEN {
        return None;
    }

    Some(trimmed.to_string())
}

/// Parses a non-2xx API response and maps it to the appropriate AppError.
pub(crate) async fn error_from_response(response: reqwest::Response, context: &str) -> AppError {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return AppError::RateLimited {
            retry_after_secs: retry_after,
        };
    }

    // 419 is Laravel's CSRF/session expiry
    if status == StatusCode::UNAUTHORIZED || status.as_u16() == 419 {
        return AppError::SessionExpired;
    }

    if status == StatusCode::NOT_FOUND {
        return AppError::NotFound(format!("{} not found", context));
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("Unable to read error body"));

    let message = extract_backend_message(&body).unwrap_or_else(|| {
        format!(
            "HTTP {} - {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        )
    });

    AppError::Backend {
        status: status.as_u16(),
        message,
    }
}

/// Maps a transport failure without leaking the request URL.
pub(crate) fn connection_error(context: &str, err: reqwest::Error) -> AppError {
    let reason = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "could not connect"
    } else {
        "request failed"
    };
    AppError::ConnectionFailed(format!("{}: {} ({})", context, reason, err.without_url()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_scheme_and_host() {
        let url = Url::parse("https://intranet.example.com/api/datacredito/estado").unwrap();

        let result = sanitize_url_for_logs(&url, LoggingMode::PathOnly);

        assert_eq!(result, "/api/datacredito/estado");
        assert!(!result.contains("intranet.example.com"));
    }

    #[test]
    fn path_only_excludes_presigned_query() {
        let url = Url::parse(
            "https://bucket.s3.amazonaws.com/in/a.txt?X-Amz-Signature=abc&X-Amz-Expires=900",
        )
        .unwrap();

        let result = sanitize_url_for_logs(&url, LoggingMode::PathOnly);

        assert_eq!(result, "/in/a.txt");
        assert!(!result.contains("abc"));
    }

    #[test]
    fn path_and_query_redacted_hides_signature_keeps_expiry() {
        let url = Url::parse(
            "https://bucket.s3.amazonaws.com/in/a.txt?X-Amz-Credential=AKIA123&X-Amz-Expires=900&X-Amz-Signature=deadbeef",
        )
        .unwrap();

        let result = sanitize_url_for_logs(&url, LoggingMode::PathAndQueryRedacted);

        assert!(result.contains("X-Amz-Expires=900"));
        assert!(result.contains("X-Amz-Credential=***"));
        assert!(result.contains("X-Amz-Signature=***"));
        assert!(!result.contains("deadbeef"));
        assert!(!result.contains("AKIA123"));
    }

    #[test]
    fn sanitize_str_handles_garbage() {
        assert_eq!(sanitize_str_for_logs("::nope", LoggingMode::PathOnly), "<invalid url>");
    }

    #[test]
    fn is_sensitive_param_is_case_insensitive_and_exact() {
        assert!(is_sensitive_param("X-AMZ-SIGNATURE"));
        assert!(is_sensitive_param("Signature"));
        assert!(!is_sensitive_param("X-Amz-Expires"));
        assert!(!is_sensitive_param("tokens"));
    }

    #[test]
    fn redact_key_shortens_long_keys() {
        assert_eq!(redact_key("outputs/2024/report.xlsx"), "outputs/...");
        assert_eq!(redact_key("short"), "short");
    }

    #[test]
    fn parse_base_url_appends_trailing_slash() {
        let url = parse_base_url("https://intranet.example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://intranet.example.com/api/");
        let joined = url.join("cartera/iniciar").unwrap();
        assert_eq!(joined.path(), "/api/cartera/iniciar");
    }

    #[test]
    fn extract_prefers_laravel_validation_errors() {
        let body = r#"{"message":"The given data was invalid.","errors":{"empresa":["El campo empresa es obligatorio."]}}"#;
        assert_eq!(
            extract_backend_message(body).as_deref(),
            Some("El campo empresa es obligatorio.")
        );
    }

    #[test]
    fn extract_uses_message_or_error_fields() {
        assert_eq!(
            extract_backend_message(r#"{"message":"Archivo corrupto"}"#).as_deref(),
            Some("Archivo corrupto")
        );
        assert_eq!(
            extract_backend_message(r#"{"error":"Worker unavailable"}"#).as_deref(),
            Some("Worker unavailable")
        );
    }

    #[test]
    fn extract_ignores_html_and_empty_bodies() {
        assert_eq!(extract_backend_message("<html><body>502</body></html>"), None);
        assert_eq!(extract_backend_message("   "), None);
        assert_eq!(extract_backend_message("{}"), None);
        assert_eq!(
            extract_backend_message("Service Unavailable").as_deref(),
            Some("Service Unavailable")
        );
    }

    #[test]
    fn build_http_client_succeeds() {
        assert!(build_http_client(&BackendConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn connection_error_keeps_reason_without_url() {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1/api/cartera/estado?key=out%2Fa.xlsx")
            .send()
            .await
            .unwrap_err();

        match connection_error("Status request failed", err) {
            AppError::ConnectionFailed(msg) => {
                assert!(msg.starts_with("Status request failed: could not connect ("));
                assert!(!msg.contains("127.0.0.1"));
                assert!(!msg.contains("out%2Fa.xlsx"));
            }
            other => panic!("expected ConnectionFailed, got {:?}", other),
        }
    }
}
