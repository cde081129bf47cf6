//! Application state shared by the UI shell.
//!
//! Wires the HTTP clients and the client-state store from configuration and
//! hands out one job lifecycle per flow.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::backend::{build_http_client, ObjectStorageClient, ProcessingClient};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::jobs::{JobFlow, JobLifecycle, JobPhase, JobServices, PollSettings};
use crate::storage::{KeyValueStore, MemoryStore, SqliteStore};

// ─────────────────────────────────────────────────────────────────────────────
// Application State
// ─────────────────────────────────────────────────────────────────────────────

pub struct AppState {
    pub config: AppConfig,
    pub services: JobServices,
    /// Durable store for active job keys.
    pub store: Arc<dyn KeyValueStore>,
}

impl AppState {
    /// Validates `config`, builds the shared HTTP client and opens the store.
    ///
    /// Without `storage.state_db_path` job keys live in memory and a restart
    /// cannot resume a running job.
    pub async fn from_config(config: AppConfig) -> Result<Self, AppError> {
        config.validate()?;

        let http = build_http_client(&config.backend)?;
        let processing = ProcessingClient::new(
            http.clone(),
            &config.backend.base_url,
            config.backend.api_token.clone(),
        )?;
        let services = JobServices::new(processing, ObjectStorageClient::new(http));

        let store: Arc<dyn KeyValueStore> = match &config.storage.state_db_path {
            Some(path) => Arc::new(SqliteStore::init(path.clone()).await?),
            None => {
                info!("[STATE] No state database configured, job keys kept in memory");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self {
            config,
            services,
            store,
        })
    }

    /// New lifecycle for `flow` with the configured polling cadence.
    pub fn lifecycle(&self, flow: JobFlow) -> JobLifecycle {
        JobLifecycle::new(
            flow,
            self.services.clone(),
            Arc::clone(&self.store),
            PollSettings::from(&self.config.polling),
        )
    }

    /// Saves the result of a completed job to `output_path`.
    ///
    /// Returns the number of bytes written.
    pub async fn download_result(
        &self,
        phase: &JobPhase,
        output_path: &Path,
    ) -> Result<u64, AppError> {
        let url = phase.download_url().ok_or_else(|| {
            AppError::InvalidInput(format!(
                "No result to download while the job is {}",
                phase.label()
            ))
        })?;
        self.services.storage.download_to(url, output_path).await
    }
}
