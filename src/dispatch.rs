//! Routes a document to the extractor for its extension.

use crate::{
    config::Limits,
    document::{Document, ErrorKind, ExtractionResult, Failure},
    extract::{Extractor, PdfExtractor, SpreadsheetExtractor, WordExtractor},
    ocr::Recognizer,
};
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use tracing::{debug, warn};

/// Every extension the pipeline accepts, lower-case, without the dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "xlsx", "xls", "png", "jpg", "jpeg", "bmp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    Pdf,
    Word,
    Spreadsheet,
    Image,
}

impl Format {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(Format::Pdf),
            "docx" => Some(Format::Word),
            "xlsx" | "xls" => Some(Format::Spreadsheet),
            "png" | "jpg" | "jpeg" | "bmp" => Some(Format::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Word => "word",
            Format::Spreadsheet => "spreadsheet",
            Format::Image => "image",
        }
    }
}

pub struct Dispatcher {
    limits: Limits,
    pdf: Box<dyn Extractor>,
    word: Box<dyn Extractor>,
    spreadsheet: Box<dyn Extractor>,
    ocr: Box<dyn Recognizer>,
}

impl Dispatcher {
    /// Built-in document extractors plus the given OCR backend for images.
    pub fn new(limits: &Limits, ocr: Box<dyn Recognizer>) -> Self {
        Self {
            limits: limits.clone(),
            pdf: Box::new(PdfExtractor),
            word: Box::new(WordExtractor),
            spreadsheet: Box::new(SpreadsheetExtractor),
            ocr,
        }
    }

    /// Replaces the extractor for a document format. Images always go to OCR.
    pub fn with_extractor(mut self, format: Format, extractor: Box<dyn Extractor>) -> Self {
        match format {
            Format::Pdf => self.pdf = extractor,
            Format::Word => self.word = extractor,
            Format::Spreadsheet => self.spreadsheet = extractor,
            Format::Image => warn!("images are handled by OCR; extractor override ignored"),
        }
        self
    }

    /// Extracts text from `doc`. Every failure comes back as data; nothing
    /// raised inside an extractor escapes.
    pub fn dispatch(&self, doc: &Document) -> ExtractionResult {
        let Some(format) = Format::from_extension(&doc.extension) else {
            return Err(Failure::new(
                ErrorKind::UnsupportedFormat,
                format!("unsupported file format: .{}", doc.extension),
            ));
        };

        let meta = match std::fs::metadata(&doc.path) {
            Ok(m) if m.is_file() => m,
            _ => {
                return Err(Failure::new(
                    ErrorKind::NotFound,
                    format!("file not found: {}", doc.path.display()),
                ));
            }
        };

        if meta.len() > self.limits.max_upload_bytes {
            return Err(Failure::new(
                ErrorKind::FileTooLarge,
                format!(
                    "file is too large: {} bytes (limit {} bytes)",
                    meta.len(),
                    self.limits.max_upload_bytes
                ),
            ));
        }
        if meta.len() == 0 {
            return Err(Failure::new(ErrorKind::EmptyDocument, "file is empty"));
        }

        debug!(format = format.as_str(), bytes = meta.len(), "dispatching document");
        match format {
            Format::Pdf => run_extractor(self.pdf.as_ref(), &doc.path),
            Format::Word => run_extractor(self.word.as_ref(), &doc.path),
            Format::Spreadsheet => run_extractor(self.spreadsheet.as_ref(), &doc.path),
            Format::Image => self.recognize_file(&doc.path),
        }
    }

    fn recognize_file(&self, path: &Path) -> ExtractionResult {
        let image = std::fs::read(path).map_err(|e| {
            Failure::new(ErrorKind::OcrError, format!("image OCR error: {e}"))
        })?;
        catch_unwind(AssertUnwindSafe(|| self.ocr.recognize(&image))).unwrap_or_else(|panic| {
            Err(Failure::new(
                ErrorKind::OcrError,
                format!("image OCR error: {}", panic_detail(&*panic)),
            ))
        })
    }
}

fn run_extractor(extractor: &dyn Extractor, path: &Path) -> ExtractionResult {
    let outcome = catch_unwind(AssertUnwindSafe(|| extractor.extract(path)));
    let detail = match outcome {
        Ok(Ok(text)) => return Ok(text),
        Ok(Err(err)) => format!("{err:#}"),
        Err(panic) => panic_detail(&*panic),
    };
    warn!(extractor = extractor.name(), "extraction failed: {detail}");
    Err(Failure::new(
        ErrorKind::ExtractionError,
        format!("{} extraction error: {detail}", extractor.name()),
    ))
}

fn panic_detail(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "extractor panicked".to_string())
}
