//! Direct transfers to and from S3-compatible storage via pre-signed URLs.
//!
//! Failures here are reported as `AppError::StorageTransfer` so the UI can
//! hint at permission or CORS problems instead of blaming the backend.

use std::path::Path;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use super::client::{sanitize_str_for_logs, LoggingMode};
use super::processing::UploadTarget;
use crate::error::AppError;
use crate::validation::{FileSource, InputFile};

/// Extracts `<Code>` / `<Message>` from an S3 XML error document.
fn parse_storage_error(body: &str) -> Option<String> {
    fn tag<'a>(body: &'a str, name: &str) -> Option<&'a str> {
        let open = format!("<{}>", name);
        let close = format!("</{}>", name);
        let start = body.find(&open)? + open.len();
        let end = body[start..].find(&close)? + start;
        Some(body[start..end].trim())
    }

    match (tag(body, "Code"), tag(body, "Message")) {
        (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
        (Some(code), None) => Some(code.to_string()),
        (None, Some(message)) => Some(message.to_string()),
        (None, None) => None,
    }
}

/// Client for pre-signed object storage URLs. Never sends the API token.
#[derive(Debug, Clone)]
pub struct ObjectStorageClient {
    client: reqwest::Client,
    logging_mode: LoggingMode,
}

impl ObjectStorageClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            logging_mode: LoggingMode::default(),
        }
    }

    pub fn with_logging_mode(mut self, mode: LoggingMode) -> Self {
        self.logging_mode = mode;
        self
    }

    /// Uploads one input file to its pre-signed URL.
    ///
    /// Disk files are streamed; the `Content-Length` header is always sent
    /// since pre-signed PUTs reject chunked bodies.
    ///
    /// # Errors
    ///
    /// - `AppError::StorageTransfer` - non-2xx response or transport failure
    /// - `AppError::Internal` - the local file could not be opened
    pub async fn upload(&self, target: &UploadTarget, file: &InputFile) -> Result<(), AppError> {
        let log_path = sanitize_str_for_logs(&target.upload_url, self.logging_mode);

        let (body, size) = match &file.source {
            FileSource::Path(path) => {
                let handle = File::open(path).await.map_err(|e| {
                    AppError::Internal(format!("Failed to open '{}': {}", file.file_name, e))
                })?;
                let metadata = handle.metadata().await.map_err(|e| {
                    AppError::Internal(format!("Failed to get file metadata: {}", e))
                })?;
                let stream = ReaderStream::new(handle);
                (reqwest::Body::wrap_stream(stream), metadata.len())
            }
            FileSource::Memory { data, .. } => {
                (reqwest::Body::from(data.clone()), data.len() as u64)
            }
        };

        info!(
            "[STORAGE] PUT {} ({}, {} bytes)",
            log_path, target.slot, size
        );

        let response = self
            .client
            .put(target.upload_url.as_str())
            .header(CONTENT_TYPE, target.content_type.as_str())
            .header(CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::StorageTransfer {
                status: None,
                message: format!("Transfer of '{}' failed: {}", target.slot, e.without_url()),
            })?;

        let status = response.status();
        info!("[STORAGE] PUT {} -> {}", log_path, status.as_u16());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = parse_storage_error(&body).unwrap_or_else(|| {
                format!(
                    "HTTP {} - {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown error")
                )
            });
            warn!("[STORAGE] Upload of '{}' rejected: {}", target.slot, detail);
            return Err(AppError::StorageTransfer {
                status: Some(status.as_u16()),
                message: detail,
            });
        }

        Ok(())
    }

    /// Streams a completed job's result to `output_path`.
    ///
    /// Writes to a temp file in the same directory and renames it into place,
    /// so a partial download never appears at `output_path`. Returns the byte count.
    pub async fn download_to(&self, url: &str, output_path: &Path) -> Result<u64, AppError> {
        let log_path = sanitize_str_for_logs(url, self.logging_mode);

        info!("[STORAGE] GET {} (downloading)", log_path);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::StorageTransfer {
                status: None,
                message: format!("Download failed: {}", e.without_url()),
            })?;

        let status = response.status();
        info!("[STORAGE] GET {} -> {}", log_path, status.as_u16());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StorageTransfer {
                status: Some(status.as_u16()),
                message: parse_storage_error(&body)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            });
        }

        // Ensure parent directory exists
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Internal(format!("Failed to create output directory: {}", e))
            })?;
        }

        let parent_dir = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;

        let std_file = temp_file
            .reopen()
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {}", e)))?;
        let mut async_file = File::from_std(std_file);

        let mut stream = response.bytes_stream();
        let mut total_bytes = 0u64;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| AppError::StorageTransfer {
                status: None,
                message: format!("Error reading download stream: {}", e.without_url()),
            })?;
            async_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Error writing to file: {}", e)))?;
            total_bytes += chunk.len() as u64;
        }

        async_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to flush output file: {}", e)))?;
        async_file
            .sync_all()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to sync output file: {}", e)))?;

        temp_file
            .persist(output_path)
            .map_err(|e| AppError::Internal(format!("Failed to persist temp file: {}", e)))?;

        info!("[STORAGE] Download complete: {} bytes", total_bytes);

        Ok(total_bytes)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
