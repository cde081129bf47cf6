//! Validation of user submissions before any network traffic.

pub mod submission;

pub use submission::{validate_submission, FileSource, InputFile, Submission, ValidatedSubmission};
