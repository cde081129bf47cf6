//! Processing API client.
//!
//! The three backend calls of a job: request pre-signed upload URLs, start
//! processing, and query job status. Response bodies vary between resources
//! (`output_key` vs `process_key`, `status` vs `estado`, list vs keyed object)
//! and are normalized here so callers only see [`UploadTarget`] and
//! [`JobStatusReport`].

use std::collections::{BTreeMap, HashMap};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::client::{
    connection_error, error_from_response, parse_base_url, redact_key, sanitize_url_for_logs,
    LoggingMode,
};
use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// File announced to the backend when requesting upload URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    pub slot: String,
    pub filename: String,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
struct UploadUrlsRequest<'a> {
    files: &'a [FileDescriptor],
}

/// Pre-signed destination for one input file.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub slot: String,
    pub upload_url: String,
    /// Storage key handed back to the backend when starting the job.
    pub key: String,
    pub content_type: String,
}

impl std::fmt::Debug for UploadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // upload_url embeds credentials
        f.debug_struct("UploadTarget")
            .field("slot", &self.slot)
            .field("upload_url", &"[REDACTED]")
            .field("key", &self.key)
            .field("content_type", &self.content_type)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    #[serde(alias = "url", alias = "presigned_url", alias = "uploadUrl")]
    upload_url: String,
    #[serde(alias = "path", alias = "s3_key")]
    key: String,
    #[serde(default, alias = "name", alias = "field")]
    slot: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WrappedTargets {
    #[serde(alias = "urls", alias = "targets", alias = "data")]
    files: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UploadTargetsPayload {
    List(Vec<RawTarget>),
    Wrapped(WrappedTargets),
    Keyed(HashMap<String, RawTarget>),
}

/// Body of the job-start call: storage keys per slot plus flow metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StartJobRequest {
    pub keys: BTreeMap<String, String>,
    #[serde(flatten)]
    pub metadata: BTreeMap<String, String>,
}

/// Normalized answer of the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatusReport {
    /// Job known but not finished. Carries the raw status for logging.
    Pending { status: String },
    /// Job not visible yet (404-class). Not an error.
    NotFound,
    Completed { download_url: String },
    Failed { message: String },
}

const COMPLETED_STATUSES: &[&str] = &["completed", "completado", "finalizado", "done", "success"];
const FAILED_STATUSES: &[&str] = &["error", "failed", "fallido", "fallo", "failure"];

/// First non-empty string (or number) among `fields`.
fn pick_str(value: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match value.get(*field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn parse_start_response(body: &Value) -> Result<String, AppError> {
    pick_str(body, &["output_key", "job_id", "process_key", "key"]).ok_or_else(|| {
        AppError::Backend {
            status: 200,
            message: "The server did not return a job key".to_string(),
        }
    })
}

fn parse_status_response(body: &Value) -> JobStatusReport {
    let status = pick_str(body, &["status", "estado"])
        .unwrap_or_default()
        .to_ascii_lowercase();

    if COMPLETED_STATUSES.contains(&status.as_str()) {
        return match pick_str(body, &["download_url", "url", "downloadUrl"]) {
            Some(download_url) => JobStatusReport::Completed { download_url },
            None => JobStatusReport::Failed {
                message: "The job finished without a download link".to_string(),
            },
        };
    }

    if FAILED_STATUSES.contains(&status.as_str()) {
        let message = pick_str(body, &["error_message", "error", "message", "mensaje"])
            .unwrap_or_else(|| "The processing job failed".to_string());
        return JobStatusReport::Failed { message };
    }

    JobStatusReport::Pending { status }
}

/// Pairs the backend's targets with the requested files.
///
/// Entries naming a slot are matched by name; anonymous entries are matched
/// by position.
fn resolve_targets(
    payload: UploadTargetsPayload,
    files: &[FileDescriptor],
) -> Result<Vec<UploadTarget>, AppError> {
    let mismatch = |detail: String| AppError::Backend {
        status: 200,
        message: format!("Unexpected upload URL response: {}", detail),
    };

    let mut keyed: HashMap<String, RawTarget> = match payload {
        UploadTargetsPayload::Keyed(map) => map,
        UploadTargetsPayload::List(list) | UploadTargetsPayload::Wrapped(WrappedTargets { files: list }) => {
            if list.len() != files.len() {
                return Err(mismatch(format!(
                    "expected {} upload URLs, got {}",
                    files.len(),
                    list.len()
                )));
            }
            let all_named = list.iter().all(|t| t.slot.is_some());
            list.into_iter()
                .zip(files)
                .map(|(target, file)| {
                    let slot = if all_named {
                        target.slot.clone().unwrap_or_default()
                    } else {
                        file.slot.clone()
                    };
                    (slot, target)
                })
                .collect()
        }
    };

    files
        .iter()
        .map(|file| {
            let raw = keyed
                .remove(&file.slot)
                .or_else(|| keyed.remove(&file.filename))
                .ok_or_else(|| mismatch(format!("no upload URL for '{}'", file.slot)))?;
            Ok(UploadTarget {
                slot: file.slot.clone(),
                upload_url: raw.upload_url,
                key: raw.key,
                content_type: file.content_type.clone(),
            })
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Client for the backend's job endpoints.
#[derive(Clone)]
pub struct ProcessingClient {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<SecretString>,
    logging_mode: LoggingMode,
}

impl std::fmt::Debug for ProcessingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingClient")
            .field("base_url", &sanitize_url_for_logs(&self.base_url, LoggingMode::PathOnly))
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ProcessingClient {
    /// Creates a client rooted at `base_url` (a trailing slash is added if missing).
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_token: Option<SecretString>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            api_token,
            logging_mode: LoggingMode::default(),
        })
    }

    pub fn with_logging_mode(mut self, mode: LoggingMode) -> Self {
        self.logging_mode = mode;
        self
    }

    fn endpoint(&self, resource: &str, action: &str) -> Result<Url, AppError> {
        let resource = resource.trim_matches('/');
        self.base_url
            .join(&format!("{}/{}", resource, action))
            .map_err(|e| AppError::Internal(format!("Failed to build URL: {}", e)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Requests one pre-signed upload URL per file.
    ///
    /// # Errors
    ///
    /// - `AppError::Backend` - non-2xx or a response that cannot be matched to the files
    /// - `AppError::SessionExpired` / `AppError::RateLimited` - auth or throttling
    /// - `AppError::ConnectionFailed` - network error
    pub async fn request_upload_targets(
        &self,
        resource: &str,
        files: &[FileDescriptor],
    ) -> Result<Vec<UploadTarget>, AppError> {
        let url = self.endpoint(resource, "generar-urls")?;
        let log_path = sanitize_url_for_logs(&url, self.logging_mode);

        info!("[PROCESSING] POST {} ({} files)", log_path, files.len());

        let response = self
            .authorize(self.client.post(url))
            .json(&UploadUrlsRequest { files })
            .send()
            .await
            .map_err(|e| connection_error("Upload URL request failed", e))?;

        let status = response.status();
        info!("[PROCESSING] POST {} -> {}", log_path, status.as_u16());

        if !status.is_success() {
            return Err(error_from_response(response, "Upload URL endpoint").await);
        }

        let payload: UploadTargetsPayload = response.json().await.map_err(|e| AppError::Backend {
            status: status.as_u16(),
            message: format!("Unexpected upload URL response: {}", e),
        })?;

        resolve_targets(payload, files)
    }

    /// Asks the backend to start processing the uploaded files.
    ///
    /// Returns the job key used for polling.
    pub async fn start_job(
        &self,
        resource: &str,
        request: &StartJobRequest,
    ) -> Result<String, AppError> {
        let url = self.endpoint(resource, "iniciar")?;
        let log_path = sanitize_url_for_logs(&url, self.logging_mode);

        info!("[PROCESSING] POST {}", log_path);

        let response = self
            .authorize(self.client.post(url))
            .json(request)
            .send()
            .await
            .map_err(|e| connection_error("Job start request failed", e))?;

        let status = response.status();
        info!("[PROCESSING] POST {} -> {}", log_path, status.as_u16());

        if !status.is_success() {
            return Err(error_from_response(response, "Job start endpoint").await);
        }

        let body: Value = response.json().await.map_err(|e| AppError::Backend {
            status: status.as_u16(),
            message: format!("Unexpected job start response: {}", e),
        })?;

        let job_key = parse_start_response(&body)?;
        info!("[PROCESSING] Job started: {}", redact_key(&job_key));
        Ok(job_key)
    }

    /// Queries the status of a job. A 404 yields [`JobStatusReport::NotFound`].
    pub async fn job_status(
        &self,
        resource: &str,
        job_key: &str,
    ) -> Result<JobStatusReport, AppError> {
        let mut url = self.endpoint(resource, "estado")?;
        url.query_pairs_mut().append_pair("key", job_key);
        let log_path = sanitize_url_for_logs(&url, LoggingMode::PathOnly);

        debug!("[PROCESSING] GET {} ({})", log_path, redact_key(job_key));

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| connection_error("Status request failed", e))?;

        let status = response.status();
        debug!("[PROCESSING] GET {} -> {}", log_path, status.as_u16());

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(JobStatusReport::NotFound);
        }

        if !status.is_success() {
            return Err(error_from_response(response, "Job status endpoint").await);
        }

        let body: Value = response.json().await.map_err(|e| AppError::Backend {
            status: status.as_u16(),
            message: format!("Unexpected status response: {}", e),
        })?;

        let report = parse_status_response(&body);
        if let JobStatusReport::Failed { message } = &report {
            warn!(
                "[PROCESSING] Job {} reported failure: {}",
                redact_key(job_key),
                message
            );
        }
        Ok(report)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_client(mock_url: &str) -> ProcessingClient {
        ProcessingClient::new(
            reqwest::Client::new(),
            mock_url,
            Some(SecretString::from("test_token".to_string())),
        )
        .unwrap()
    }

    fn descriptors() -> Vec<FileDescriptor> {
        vec![
            FileDescriptor {
                slot: "reporte".into(),
                filename: "reporte.txt".into(),
                content_type: "text/plain".into(),
            },
            FileDescriptor {
                slot: "maestro".into(),
                filename: "maestro.xlsx".into(),
                content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                    .into(),
            },
        ]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Upload URL Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_request_upload_targets_sends_descriptors_and_token() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("POST"))
            .and(path("/datacredito/generar-urls"))
            .and(header("Authorization", "Bearer test_token"))
            .and(body_json(json!({
                "files": [
                    {"slot": "reporte", "filename": "reporte.txt", "content_type": "text/plain"},
                    {"slot": "maestro", "filename": "maestro.xlsx",
                     "content_type": "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"upload_url": "https://s3.test/in/r.txt?X-Amz-Signature=a", "key": "in/r.txt"},
                {"upload_url": "https://s3.test/in/m.xlsx?X-Amz-Signature=b", "key": "in/m.xlsx"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let targets = client
            .request_upload_targets("datacredito", &descriptors())
            .await
            .unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].slot, "reporte");
        assert_eq!(targets[0].key, "in/r.txt");
        assert_eq!(targets[0].content_type, "text/plain");
        assert_eq!(targets[1].key, "in/m.xlsx");
    }

    #[tokio::test]
    async fn test_request_upload_targets_accepts_keyed_object() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("POST"))
            .and(path("/datacredito/generar-urls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "maestro": {"url": "https://s3.test/m", "key": "in/m.xlsx"},
                "reporte": {"url": "https://s3.test/r", "key": "in/r.txt"}
            })))
            .mount(&mock_server)
            .await;

        let targets = client
            .request_upload_targets("datacredito", &descriptors())
            .await
            .unwrap();

        assert_eq!(targets[0].slot, "reporte");
        assert_eq!(targets[0].upload_url, "https://s3.test/r");
        assert_eq!(targets[1].key, "in/m.xlsx");
    }

    #[tokio::test]
    async fn test_request_upload_targets_matches_named_entries_out_of_order() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("POST"))
            .and(path("/datacredito/generar-urls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "urls": [
                    {"name": "maestro", "upload_url": "https://s3.test/m", "key": "in/m.xlsx"},
                    {"name": "reporte", "upload_url": "https://s3.test/r", "key": "in/r.txt"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let targets = client
            .request_upload_targets("datacredito", &descriptors())
            .await
            .unwrap();

        assert_eq!(targets[0].key, "in/r.txt");
        assert_eq!(targets[1].key, "in/m.xlsx");
    }

    #[tokio::test]
    async fn test_request_upload_targets_count_mismatch_is_backend_error() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"upload_url": "https://s3.test/r", "key": "in/r.txt"}
            ])))
            .mount(&mock_server)
            .await;

        let result = client.request_upload_targets("datacredito", &descriptors()).await;

        assert!(matches!(result, Err(AppError::Backend { .. })));
    }

    #[tokio::test]
    async fn test_request_upload_targets_surfaces_validation_message() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "The given data was invalid.",
                "errors": {"files": ["Formato no permitido"]}
            })))
            .mount(&mock_server)
            .await;

        let err = client
            .request_upload_targets("datacredito", &descriptors())
            .await
            .unwrap_err();

        match err {
            AppError::Backend { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Formato no permitido");
            }
            other => panic!("Expected Backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_session_expiry_maps_to_session_expired() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(419))
            .mount(&mock_server)
            .await;

        let result = client.request_upload_targets("cartera", &descriptors()).await;

        assert!(matches!(result, Err(AppError::SessionExpired)));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Start Job Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_start_job_flattens_metadata_and_reads_output_key() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("POST"))
            .and(path("/datacredito/iniciar"))
            .and(body_json(json!({
                "keys": {"maestro": "in/m.xlsx", "reporte": "in/r.txt"},
                "empresa": "ACME"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"output_key": "out/abc123.xlsx"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut request = StartJobRequest::default();
        request.keys.insert("reporte".into(), "in/r.txt".into());
        request.keys.insert("maestro".into(), "in/m.xlsx".into());
        request.metadata.insert("empresa".into(), "ACME".into());

        let key = client.start_job("datacredito", &request).await.unwrap();

        assert_eq!(key, "out/abc123.xlsx");
    }

    #[tokio::test]
    async fn test_start_job_accepts_alternate_key_fields() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("POST"))
            .and(path("/cartera/iniciar"))
            .respond_with(
                ResponseTemplate::new(202).set_body_json(json!({"process_key": "proc-77", "message": "ok"})),
            )
            .mount(&mock_server)
            .await;

        let key = client
            .start_job("cartera", &StartJobRequest::default())
            .await
            .unwrap();

        assert_eq!(key, "proc-77");
    }

    #[tokio::test]
    async fn test_start_job_without_key_is_error() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .mount(&mock_server)
            .await;

        let result = client.start_job("cartera", &StartJobRequest::default()).await;

        assert!(matches!(result, Err(AppError::Backend { .. })));
    }

    #[tokio::test]
    async fn test_start_job_plain_error_falls_back_to_status_line() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&mock_server)
            .await;

        let err = client
            .start_job("cartera", &StartJobRequest::default())
            .await
            .unwrap_err();

        match err {
            AppError::Backend { message, .. } => assert_eq!(message, "HTTP 502 - Bad Gateway"),
            other => panic!("Expected Backend error, got {:?}", other),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_job_status_completed() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/datacredito/estado"))
            .and(query_param("key", "out/abc123.xlsx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "completed",
                "download_url": "https://s3.test/out/abc123.xlsx?X-Amz-Signature=z"
            })))
            .mount(&mock_server)
            .await;

        let report = client.job_status("datacredito", "out/abc123.xlsx").await.unwrap();

        assert_eq!(
            report,
            JobStatusReport::Completed {
                download_url: "https://s3.test/out/abc123.xlsx?X-Amz-Signature=z".into()
            }
        );
    }

    #[tokio::test]
    async fn test_job_status_404_is_not_found() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/cartera/estado"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let report = client.job_status("cartera", "proc-77").await.unwrap();

        assert_eq!(report, JobStatusReport::NotFound);
    }

    #[tokio::test]
    async fn test_job_status_estado_variants() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .and(query_param("key", "running"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"estado": "procesando"})))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("key", "broken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "estado": "ERROR",
                "error_message": "Columna NIT no encontrada"
            })))
            .mount(&mock_server)
            .await;

        let pending = client.job_status("cartera", "running").await.unwrap();
        let failed = client.job_status("cartera", "broken").await.unwrap();

        assert_eq!(pending, JobStatusReport::Pending { status: "procesando".into() });
        assert_eq!(
            failed,
            JobStatusReport::Failed { message: "Columna NIT no encontrada".into() }
        );
    }

    #[tokio::test]
    async fn test_job_status_server_error_is_error() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "Worker down"})))
            .mount(&mock_server)
            .await;

        let result = client.job_status("cartera", "proc-77").await;

        assert!(matches!(
            result,
            Err(AppError::Backend { status: 500, ref message }) if message == "Worker down"
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri());

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
            .mount(&mock_server)
            .await;

        let result = client.job_status("cartera", "proc-77").await;

        assert!(matches!(
            result,
            Err(AppError::RateLimited { retry_after_secs: Some(12) })
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Normalization
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn completed_without_url_is_failure() {
        let report = parse_status_response(&json!({"status": "completed"}));
        assert!(matches!(report, JobStatusReport::Failed { .. }));
    }

    #[test]
    fn missing_status_is_pending() {
        assert_eq!(
            parse_status_response(&json!({})),
            JobStatusReport::Pending { status: String::new() }
        );
    }

    #[test]
    fn numeric_job_id_is_stringified() {
        assert_eq!(parse_start_response(&json!({"job_id": 42})).unwrap(), "42");
    }

    #[test]
    fn upload_target_debug_hides_url() {
        let target = UploadTarget {
            slot: "reporte".into(),
            upload_url: "https://s3.test/r?X-Amz-Signature=secret".into(),
            key: "in/r.txt".into(),
            content_type: "text/plain".into(),
        };
        assert!(!format!("{:?}", target).contains("secret"));
    }
}
