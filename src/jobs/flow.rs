//! Flow definitions: which files a job needs and where it lives on the backend.

use serde::Serialize;

/// One required input file of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSlot {
    /// Field name sent to the backend (`reporte`, `maestro`, ...).
    pub name: String,
    /// Content type declared when requesting the upload URL and on the PUT.
    pub content_type: String,
    /// Accepted lowercase extensions without the dot. Empty accepts anything.
    pub extensions: Vec<String>,
}

impl FileSlot {
    pub fn new(name: &str, content_type: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            content_type: content_type.to_string(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    /// Whether `file_name` ends with one of the accepted extensions.
    pub fn accepts(&self, file_name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let ext = match file_name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return false,
        };
        self.extensions.iter().any(|e| *e == ext)
    }
}

/// Parameters of one Upload-Process-Poll lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFlow {
    /// Human-readable name used in logs.
    pub name: String,
    /// Backend URL segment (`{base}/{resource}/generar-urls`, ...).
    pub resource: String,
    pub slots: Vec<FileSlot>,
    /// Metadata fields that must be present and non-blank.
    pub required_metadata: Vec<String>,
    /// Durable key under which the active job key is stored.
    pub persistence_key: String,
}

const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

impl JobFlow {
    /// DataCrédito report processing: plain-text report plus the xlsx master file.
    pub fn datacredito() -> Self {
        Self {
            name: "DataCrédito".to_string(),
            resource: "datacredito".to_string(),
            slots: vec![
                FileSlot::new("reporte", "text/plain", &["txt"]),
                FileSlot::new("maestro", XLSX, &["xlsx"]),
            ],
            required_metadata: vec!["empresa".to_string()],
            persistence_key: "datacredito_output_key".to_string(),
        }
    }

    /// Portfolio analytics: portfolio and collections workbooks.
    pub fn cartera() -> Self {
        Self {
            name: "Cartera".to_string(),
            resource: "cartera".to_string(),
            slots: vec![
                FileSlot::new("cartera", XLSX, &["xlsx"]),
                FileSlot::new("recaudo", XLSX, &["xlsx"]),
            ],
            required_metadata: Vec::new(),
            persistence_key: "cartera_process_key".to_string(),
        }
    }

    pub fn slot(&self, name: &str) -> Option<&FileSlot> {
        self.slots.iter().find(|s| s.name == name)
    }
}
