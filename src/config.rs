//! Layered application configuration.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults (`Default` impls below)
//! 2. Optional TOML file
//! 3. Environment variables, `PORTAL__SECTION__KEY` (e.g. `PORTAL__BACKEND__BASE_URL`)

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::AppError;

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "PORTAL";

/// Default backend request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default interval between job status polls.
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub polling: PollingConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the intranet REST API.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// API root, e.g. `https://intranet.example.com/api/`.
    pub base_url: String,
    /// Bearer token for the API. Never logged.
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_token: Option<SecretString>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/".to_string(),
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("IntranetPortal/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(SecretString::from))
}

/// Job status polling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Upper bound on how long a single job is polled. Unset polls forever.
    pub max_duration_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_duration_secs: None,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}

/// Where durable client state (active job keys) lives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file for persisted job keys. Unset keeps state in memory only.
    pub state_db_path: Option<PathBuf>,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from defaults, an optional TOML file and the environment.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to load configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("Invalid configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks invariants the deserializer cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        url::Url::parse(&self.backend.base_url).map_err(|e| {
            AppError::Config(format!("backend.base_url is not a valid URL: {}", e))
        })?;

        if self.polling.interval_ms == 0 {
            return Err(AppError::Config(
                "polling.interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.polling.interval(), Duration::from_secs(5));
        assert!(config.polling.max_duration().is_none());
        assert!(config.storage.state_db_path.is_none());
    }

    #[test]
    fn load_reads_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[backend]
base_url = "https://intranet.example.com/api/"
timeout_secs = 60

[polling]
interval_ms = 1500
max_duration_secs = 900
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.backend.base_url, "https://intranet.example.com/api/");
        assert_eq!(config.backend.timeout_secs, 60);
        assert_eq!(config.polling.interval(), Duration::from_millis(1500));
        assert_eq!(config.polling.max_duration(), Some(Duration::from_secs(900)));
        // Sections absent from the file keep their defaults
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.polling.interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = AppConfig::default();
        config.backend.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = AppConfig::default();
        config.polling.interval_ms = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn debug_redacts_api_token() {
        let mut config = BackendConfig::default();
        config.api_token = Some(SecretString::from("super-secret-token".to_string()));
        let out = format!("{:?}", config);
        assert!(!out.contains("super-secret-token"));
        assert!(out.contains("[REDACTED]"));
    }
}
