//! Backend seam of the lifecycle, so it can run against fakes in tests.

use std::future::Future;
use std::pin::Pin;

use crate::backend::{
    FileDescriptor, JobStatusReport, ObjectStorageClient, ProcessingClient, StartJobRequest,
    UploadTarget,
};
use crate::error::AppError;
use crate::validation::InputFile;

/// The four external calls a job lifecycle makes.
pub trait JobBackendOps: Send + Sync + 'static {
    fn request_upload_targets<'a>(
        &'a self,
        resource: &'a str,
        files: &'a [FileDescriptor],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<UploadTarget>, AppError>> + Send + 'a>>;

    fn transfer<'a>(
        &'a self,
        target: &'a UploadTarget,
        file: &'a InputFile,
    ) -> Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>>;

    fn start_job<'a>(
        &'a self,
        resource: &'a str,
        request: &'a StartJobRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, AppError>> + Send + 'a>>;

    fn job_status<'a>(
        &'a self,
        resource: &'a str,
        job_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<JobStatusReport, AppError>> + Send + 'a>>;
}

/// Production implementation: backend API plus direct storage transfers.
#[derive(Debug, Clone)]
pub struct JobServices {
    pub processing: ProcessingClient,
    pub storage: ObjectStorageClient,
}

impl JobServices {
    pub fn new(processing: ProcessingClient, storage: ObjectStorageClient) -> Self {
        Self {
            processing,
            storage,
        }
    }
}

impl JobBackendOps for JobServices {
    fn request_upload_targets<'a>(
        &'a self,
        resource: &'a str,
        files: &'a [FileDescriptor],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<UploadTarget>, AppError>> + Send + 'a>> {
        Box::pin(self.processing.request_upload_targets(resource, files))
    }

    fn transfer<'a>(
        &'a self,
        target: &'a UploadTarget,
        file: &'a InputFile,
    ) -> Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>> {
        Box::pin(self.storage.upload(target, file))
    }

    fn start_job<'a>(
        &'a self,
        resource: &'a str,
        request: &'a StartJobRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, AppError>> + Send + 'a>> {
        Box::pin(self.processing.start_job(resource, request))
    }

    fn job_status<'a>(
        &'a self,
        resource: &'a str,
        job_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<JobStatusReport, AppError>> + Send + 'a>> {
        Box::pin(self.processing.job_status(resource, job_key))
    }
}
