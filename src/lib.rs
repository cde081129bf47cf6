//! Client core of the intranet portal.
//!
//! - [`jobs`]: Upload-Process-Poll lifecycle for backend report jobs
//!   (request pre-signed URLs, upload straight to storage, start, poll).
//! - [`aggregation`]: stacked and two-level hierarchical chart aggregates
//!   over backend record lists, with a frontend-only filter overlay.
//! - [`state`]: wires configuration, HTTP clients and the client-state store.

pub mod aggregation;
pub mod backend;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod state;
pub mod storage;
pub mod validation;

pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;
