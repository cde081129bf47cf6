//! SQLite-backed client state with schema migrations.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use super::kv::KeyValueStore;
use crate::error::AppError;

/// Current schema version. Increment when adding new migrations.
const SCHEMA_VERSION: i32 = 2;

/// V1 schema: key-value table for client state.
const V1_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS client_state (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
"#;

/// V2 migration: tracks when each entry was last written.
const V2_MIGRATION: &str = r#"
ALTER TABLE client_state ADD COLUMN updated_at INTEGER NOT NULL DEFAULT 0;
"#;

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Durable [`KeyValueStore`] in a SQLite file.
///
/// Every call opens its own connection on the blocking pool, so the handle is
/// cheap to clone and share.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Opens (or creates) the store at `db_path` and runs pending migrations.
    pub async fn init(db_path: PathBuf) -> Result<Self, AppError> {
        let path = db_path.clone();

        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::LocalStore(format!("Failed to create state directory: {e}"))
                })?;
            }

            let mut conn = open_connection(&path)?;
            run_migrations(&mut conn)?;

            Ok::<_, AppError>(())
        })
        .await
        .map_err(|e| AppError::Internal(format!("State store init task failed: {e}")))??;

        info!("[STATE-DB] Opened client state at {}", db_path.display());

        Ok(Self { db_path })
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, AppError> {
        let db_path = self.db_path.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;

            let value = conn
                .query_row(
                    "SELECT value FROM client_state WHERE key = ?1",
                    [&key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(|e| AppError::LocalStore(format!("Failed to read '{key}': {e}")))?;

            Ok::<_, AppError>(value)
        })
        .await
        .map_err(|e| AppError::Internal(format!("State read task failed: {e}")))?
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<(), AppError> {
        let db_path = self.db_path.clone();
        let key = key.to_string();
        let value = value.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;

            conn.execute(
                r#"
                INSERT INTO client_state (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                rusqlite::params![key, value, now_millis()],
            )
            .map_err(|e| AppError::LocalStore(format!("Failed to write '{key}': {e}")))?;

            debug!("[STATE-DB] Stored {}", key);

            Ok::<_, AppError>(())
        })
        .await
        .map_err(|e| AppError::Internal(format!("State write task failed: {e}")))?
    }

    async fn remove_value(&self, key: &str) -> Result<(), AppError> {
        let db_path = self.db_path.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;

            conn.execute("DELETE FROM client_state WHERE key = ?1", [&key])
                .map_err(|e| AppError::LocalStore(format!("Failed to remove '{key}': {e}")))?;

            debug!("[STATE-DB] Removed {}", key);

            Ok::<_, AppError>(())
        })
        .await
        .map_err(|e| AppError::Internal(format!("State remove task failed: {e}")))?
    }
}

impl KeyValueStore for SqliteStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, AppError>> + Send + 'a>> {
        Box::pin(self.get_value(key))
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>> {
        Box::pin(self.set_value(key, value))
    }

    fn remove<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>> {
        Box::pin(self.remove_value(key))
    }
}

fn open_connection(path: &PathBuf) -> Result<Connection, AppError> {
    let conn = Connection::open(path)
        .map_err(|e| AppError::LocalStore(format!("Failed to open state database: {e}")))?;
    configure_connection(&conn)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> Result<(), AppError> {
    conn.busy_timeout(Duration::from_secs(10))
        .map_err(|e| AppError::LocalStore(format!("Failed to set busy timeout: {e}")))?;

    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| AppError::LocalStore(format!("Failed to set WAL mode: {e}")))?;

    Ok(())
}

fn run_migrations(conn: &mut Connection) -> Result<(), AppError> {
    let current_version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| AppError::LocalStore(format!("Failed to get schema version: {e}")))?;

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction().map_err(|e| {
        AppError::LocalStore(format!("Failed to start migration transaction: {e}"))
    })?;

    if current_version < 1 {
        tx.execute_batch(V1_SCHEMA)
            .map_err(|e| AppError::LocalStore(format!("V1 migration failed: {e}")))?;
    }

    if current_version < 2 {
        tx.execute_batch(V2_MIGRATION)
            .map_err(|e| AppError::LocalStore(format!("V2 migration failed: {e}")))?;
    }

    tx.pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(|e| AppError::LocalStore(format!("Failed to update schema version: {e}")))?;

    tx.commit()
        .map_err(|e| AppError::LocalStore(format!("Failed to commit migration: {e}")))?;

    info!(
        "[STATE-DB] Migrated schema from v{} to v{}",
        current_version, SCHEMA_VERSION
    );

    Ok(())
}
