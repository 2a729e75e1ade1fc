use super::Extractor;
use anyhow::{Context, Result, anyhow};
use std::path::Path;

/// Text layer of a PDF, pages in document order. Scanned pages without a
/// text layer come out empty; there is no OCR fallback for PDFs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "PDF"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| anyhow!("{e}"))
    }
}
