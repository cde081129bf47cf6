//! HTTP clients for the processing backend and object storage.

pub mod client;
pub mod object_storage;
pub mod processing;

pub use client::{build_http_client, sanitize_url_for_logs, LoggingMode};
pub use object_storage::ObjectStorageClient;
pub use processing::{
    FileDescriptor, JobStatusReport, ProcessingClient, StartJobRequest, UploadTarget,
};
