//! Durable client state: the key-value seam and its SQLite and in-memory backends.

mod database;
pub mod kv;

pub use database::SqliteStore;
pub use kv::{KeyValueStore, MemoryStore};
