//! Observable lifecycle state and operation outcomes.

use serde::Serialize;

/// Phase of a job lifecycle.
///
/// `Idle → Uploading → Starting → Processing → Completed | Error`, and any
/// phase returns to `Idle` on reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPhase {
    Idle,
    Uploading,
    Starting,
    Processing { job_key: String },
    Completed { job_key: String, download_url: String },
    Error { message: String },
}

impl JobPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, JobPhase::Idle)
    }

    /// `Completed` or `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed { .. } | JobPhase::Error { .. })
    }

    pub fn job_key(&self) -> Option<&str> {
        match self {
            JobPhase::Processing { job_key } | JobPhase::Completed { job_key, .. } => {
                Some(job_key)
            }
            _ => None,
        }
    }

    pub fn download_url(&self) -> Option<&str> {
        match self {
            JobPhase::Completed { download_url, .. } => Some(download_url),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            JobPhase::Error { message } => Some(message),
            _ => None,
        }
    }

    /// Short lowercase name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            JobPhase::Idle => "idle",
            JobPhase::Uploading => "uploading",
            JobPhase::Starting => "starting",
            JobPhase::Processing { .. } => "processing",
            JobPhase::Completed { .. } => "completed",
            JobPhase::Error { .. } => "error",
        }
    }
}

/// Result of [`JobLifecycle::submit`](super::JobLifecycle::submit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The job was started and is now being polled.
    Accepted { job_key: String },
    /// A job was already active; nothing happened.
    Ignored,
    /// A step failed; the lifecycle is in `Error` with the same message.
    Failed { message: String },
    /// The lifecycle was reset while the submission was in flight; its
    /// results were discarded.
    Superseded,
}

/// Result of a single status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Not finished yet (including "not found yet").
    Pending,
    Completed { download_url: String },
    Failed { message: String },
    /// The job is no longer the active one; the response was ignored.
    Stale,
}

impl PollOutcome {
    pub fn is_final(&self) -> bool {
        !matches!(self, PollOutcome::Pending)
    }
}
