//! Tracing subscriber setup.
//!
//! Call once from the embedding shell before creating [`crate::state::AppState`].
//! `RUST_LOG` overrides the configured level when present.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::AppError;

/// Builds the filter: `RUST_LOG` first, then the configured level.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, AppError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            AppError::Config(format!("Invalid log level '{}': {}", config.level, e))
        }),
    }
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns `AppError::Config` for an invalid level directive and
/// `AppError::Internal` if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), AppError> {
    let filter = build_filter(config)?;

    let result = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };

    result.map_err(|e| AppError::Internal(format!("Failed to install tracing subscriber: {}", e)))
}
