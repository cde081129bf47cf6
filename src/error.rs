use serde::Serialize;
use thiserror::Error;

/// Patterns (lowercase) that indicate sensitive data not safe for UI display.
/// Used by `contains_sensitive()` for case-insensitive matching.
pub(crate) const SENSITIVE_PATTERNS: &[&str] = &[
    "bearer ",
    "authorization:",
    "api_token",
    "x-amz-signature",
    "x-amz-credential",
    "x-amz-security-token",
];

/// Returns true if the message contains any sensitive pattern (case-insensitive).
fn contains_sensitive(msg: &str) -> bool {
    let lower = msg.to_ascii_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Sanitizes a message for UI display.
/// If sensitive content is detected, returns the fallback instead.
fn sanitize_message(msg: &str, fallback: &str) -> String {
    if contains_sensitive(msg) {
        fallback.into()
    } else {
        msg.to_string()
    }
}

/// User-friendly error presentation for the UI shell.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPresentation {
    pub title: String,
    pub message: String,
    pub action: Option<String>,
}

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Input ─────────────────────────────────────────────────────────────────
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ── Backend API ───────────────────────────────────────────────────────────
    #[error("Session expired")]
    SessionExpired,

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    // ── Object storage ────────────────────────────────────────────────────────
    #[error("Storage transfer failed: {message}")]
    StorageTransfer { status: Option<u16>, message: String },

    // ── Processing jobs ───────────────────────────────────────────────────────
    #[error("Job {job_key} failed: {message}")]
    JobFailed { job_key: String, message: String },

    #[error("Job {job_key} did not finish within {elapsed_secs} seconds")]
    PollingTimeout { job_key: String, elapsed_secs: u64 },

    // ── Network ───────────────────────────────────────────────────────────────
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // ── Local state / configuration ───────────────────────────────────────────
    #[error("Local storage error: {0}")]
    LocalStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // ── Generic fallback ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Converts the error into a user-friendly presentation suitable for UI display.
    /// Never leaks tokens or pre-signed URL signatures.
    pub fn to_presentation(&self) -> ErrorPresentation {
        match self {
            // ── Input ─────────────────────────────────────────────────────────
            AppError::InvalidInput(msg) => ErrorPresentation {
                title: "Missing or Invalid Files".into(),
                message: sanitize_message(msg, "Some of the submitted data is invalid."),
                action: Some("Select the required files and try again".into()),
            },

            // ── Backend API ───────────────────────────────────────────────────
            AppError::SessionExpired => ErrorPresentation {
                title: "Session Expired".into(),
                message: "Your intranet session has expired.".into(),
                action: Some("Log in again".into()),
            },

            AppError::Backend { status: _, message } => ErrorPresentation {
                title: "Server Error".into(),
                message: sanitize_message(message, "The server could not complete the request."),
                action: Some("Review the files and submit again".into()),
            },

            AppError::NotFound(msg) => ErrorPresentation {
                title: "Not Found".into(),
                message: sanitize_message(msg, "The requested resource was not found."),
                action: None,
            },

            AppError::RateLimited { retry_after_secs } => {
                let wait_msg = match retry_after_secs {
                    Some(secs) => format!("Please wait {} seconds before trying again.", secs),
                    None => "Please wait a moment before trying again.".into(),
                };
                ErrorPresentation {
                    title: "Too Many Requests".into(),
                    message: format!("The server is limiting requests. {}", wait_msg),
                    action: Some("Wait and retry".into()),
                }
            }

            // ── Object storage ────────────────────────────────────────────────
            AppError::StorageTransfer { status, message: _ } => {
                let detail = match status {
                    Some(code) => format!(" (HTTP {})", code),
                    None => String::new(),
                };
                ErrorPresentation {
                    title: "File Upload Failed".into(),
                    message: format!(
                        "The file storage service rejected the transfer{}. The upload link may have expired, or the bucket's permission or CORS rules do not allow it.",
                        detail
                    ),
                    action: Some("Submit the files again or contact an administrator".into()),
                }
            }

            // ── Processing jobs ───────────────────────────────────────────────
            AppError::JobFailed { job_key: _, message } => ErrorPresentation {
                title: "Processing Failed".into(),
                message: sanitize_message(message, "The file processing job failed."),
                action: Some("Review the files and submit again".into()),
            },

            AppError::PollingTimeout { job_key: _, elapsed_secs } => ErrorPresentation {
                title: "Processing Is Taking Too Long".into(),
                message: format!(
                    "The job did not finish after {} seconds of waiting.",
                    elapsed_secs
                ),
                action: Some("Try again later".into()),
            },

            // ── Network ───────────────────────────────────────────────────────
            AppError::ConnectionFailed(_) => ErrorPresentation {
                title: "Connection Failed".into(),
                message: "Could not reach the intranet server. Please check your network connection.".into(),
                action: Some("Check network and retry".into()),
            },

            // ── Local state / configuration ───────────────────────────────────
            AppError::LocalStore(_) => ErrorPresentation {
                title: "Local Storage Error".into(),
                message: "Could not read or write the saved job state.".into(),
                action: Some("Try again".into()),
            },

            AppError::Config(msg) => ErrorPresentation {
                title: "Configuration Error".into(),
                message: sanitize_message(msg, "The application configuration is invalid."),
                action: Some("Contact an administrator".into()),
            },

            // ── Generic ───────────────────────────────────────────────────────
            AppError::Internal(_) => ErrorPresentation {
                title: "Unexpected Error".into(),
                message: "Something went wrong. Please try again.".into(),
                action: Some("Try again".into()),
            },
        }
    }

    /// Single display-ready line for state-machine error phases.
    ///
    /// Backend and job failures surface the server's own message. Transfer
    /// and connection failures append the underlying detail to the hint.
    pub fn display_message(&self) -> String {
        let presentation = self.to_presentation();
        match self {
            AppError::StorageTransfer { message: detail, .. }
            | AppError::ConnectionFailed(detail) => {
                let detail = sanitize_message(detail.trim(), "");
                if detail.is_empty() {
                    presentation.message
                } else {
                    format!("{} ({})", presentation.message, detail)
                }
            }
            _ => format!("{}: {}", presentation.title, presentation.message),
        }
    }
}

// Allow AppError to be handed to the UI shell as structured data
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_presentation().serialize(serializer)
    }
}
