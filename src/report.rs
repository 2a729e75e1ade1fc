use crate::dispatch::Format;
use serde::{Deserialize, Serialize};

/// JSON summary of one `analyze` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub input: ReportInput,
    pub started: String,
    pub finished: String,
    pub prompt: Option<String>,
    pub extracted_text: String,
    pub analysis: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInput {
    pub path: String,
    pub extension: String,
    pub format: Option<Format>,
    pub size_bytes: u64,
    /// Hex SHA-256 of the file; absent when it could not be read.
    pub sha256: Option<String>,
}
