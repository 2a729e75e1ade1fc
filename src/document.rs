use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// An uploaded file as handed over by the caller. The pipeline only reads it;
/// the caller owns the file's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: PathBuf,
    /// Lower-cased, without the leading dot. Empty when the name has none.
    pub extension: String,
    pub size_bytes: u64,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, extension: &str, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            extension: extension.trim_start_matches('.').to_ascii_lowercase(),
            size_bytes,
        }
    }

    /// Builds a document from a path on disk. A missing file yields size 0; the
    /// dispatcher reports it as `NotFound`.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Self::new(path, extension, size_bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    UnsupportedFormat,
    FileTooLarge,
    EmptyDocument,
    ExtractionError,
    OcrError,
    InvalidCredential,
    RateLimited,
    NetworkError,
    HttpStatus,
    MalformedResponse,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::FileTooLarge => "file_too_large",
            ErrorKind::EmptyDocument => "empty_document",
            ErrorKind::ExtractionError => "extraction_error",
            ErrorKind::OcrError => "ocr_error",
            ErrorKind::InvalidCredential => "invalid_credential",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    /// Transient kinds the completion client may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::NetworkError | ErrorKind::HttpStatus)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified failure. The message is what the end user sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Outcome of one extractor or OCR invocation.
pub type ExtractionResult = Result<String, Failure>;

/// Outcome of one completion call.
pub type AnalysisResult = Result<String, Failure>;

/// Input to the completion client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub prompt: Option<String>,
    pub text: String,
}

impl AnalysisRequest {
    pub fn new(prompt: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            prompt: prompt
                .filter(|p| !p.trim().is_empty())
                .map(str::to_string),
            text: text.into(),
        }
    }

    /// The single user message sent to the model.
    pub fn message_text(&self) -> String {
        match &self.prompt {
            Some(prompt) => format!("{prompt}\n\n{}", self.text),
            None => self.text.clone(),
        }
    }
}
