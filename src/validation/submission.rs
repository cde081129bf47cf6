//! Submission validation.
//!
//! Everything is checked before any network call: each slot of the flow needs
//! exactly one non-empty file with an accepted extension, and the required
//! metadata must be present. All problems are reported together.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::AppError;
use crate::jobs::JobFlow;

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Where a selected file's bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on disk. The file name is taken from the path.
    Path(PathBuf),
    /// Bytes already in memory (drag-and-drop, tests).
    Memory { file_name: String, data: Vec<u8> },
}

impl FileSource {
    /// Convenience constructor for in-memory files.
    pub fn memory(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        FileSource::Memory {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    pub fn file_name(&self) -> Option<String> {
        match self {
            FileSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            FileSource::Memory { file_name, .. } => Some(file_name.clone()),
        }
    }
}

/// What the user selected: one file per slot plus free-form metadata.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub files: BTreeMap<String, FileSource>,
    pub metadata: BTreeMap<String, String>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, slot: &str, source: FileSource) -> Self {
        self.files.insert(slot.to_string(), source);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// A file that passed validation, ready to be transferred.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub slot: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub source: FileSource,
}

/// Output of [`validate_submission`], files in slot order.
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub files: Vec<InputFile>,
    /// Metadata with surrounding whitespace trimmed.
    pub metadata: BTreeMap<String, String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Validates a submission against `flow`.
///
/// # Errors
///
/// `AppError::InvalidInput` with every problem found, joined by `"; "`.
pub async fn validate_submission(
    flow: &JobFlow,
    submission: &Submission,
) -> Result<ValidatedSubmission, AppError> {
    let mut problems: Vec<String> = Vec::new();
    let mut files = Vec::with_capacity(flow.slots.len());

    for name in submission.files.keys() {
        if flow.slot(name).is_none() {
            problems.push(format!("unexpected file '{}'", name));
        }
    }

    for slot in &flow.slots {
        let Some(source) = submission.files.get(&slot.name) else {
            problems.push(format!("missing file '{}'", slot.name));
            continue;
        };

        let Some(file_name) = source.file_name().filter(|n| !n.trim().is_empty()) else {
            problems.push(format!("file '{}' has no name", slot.name));
            continue;
        };

        if !slot.accepts(&file_name) {
            problems.push(format!(
                "file '{}' must be one of: {}",
                slot.name,
                slot.extensions.join(", ")
            ));
            continue;
        }

        let size_bytes = match source {
            FileSource::Path(path) => match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => meta.len(),
                Ok(_) => {
                    problems.push(format!("file '{}' is not a regular file", slot.name));
                    continue;
                }
                Err(e) => {
                    problems.push(format!("file '{}' cannot be read: {}", slot.name, e));
                    continue;
                }
            },
            FileSource::Memory { data, .. } => data.len() as u64,
        };

        if size_bytes == 0 {
            problems.push(format!("file '{}' is empty", slot.name));
            continue;
        }

        files.push(InputFile {
            slot: slot.name.clone(),
            file_name,
            content_type: slot.content_type.clone(),
            size_bytes,
            source: source.clone(),
        });
    }

    let mut metadata = BTreeMap::new();
    for (key, value) in &submission.metadata {
        metadata.insert(key.clone(), value.trim().to_string());
    }
    for field in &flow.required_metadata {
        if metadata.get(field).map_or(true, |v| v.is_empty()) {
            problems.push(format!("missing value for '{}'", field));
        }
    }

    if !problems.is_empty() {
        return Err(AppError::InvalidInput(problems.join("; ")));
    }

    Ok(ValidatedSubmission { files, metadata })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
