pub mod docx;
pub mod pdf;
pub mod sheet;

use anyhow::Result;
use std::path::Path;

pub use docx::WordExtractor;
pub use pdf::PdfExtractor;
pub use sheet::SpreadsheetExtractor;

/// Turns a document on disk into plain text. Implementations only read the
/// file and must not keep handles open past the call.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, path: &Path) -> Result<String>;
}
