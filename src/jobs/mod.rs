//! Upload-Process-Poll job lifecycles.

pub mod flow;
mod lifecycle;
mod ops;
mod phase;
mod poller;

pub use flow::{FileSlot, JobFlow};
pub use lifecycle::{JobLifecycle, PollSettings};
pub use ops::{JobBackendOps, JobServices};
pub use phase::{JobPhase, PollOutcome, SubmitOutcome};
