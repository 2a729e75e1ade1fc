use super::Extractor;
use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Body paragraphs of a `.docx`, newline-joined in document order. Paragraphs
/// inside tables and text boxes are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordExtractor;

impl Extractor for WordExtractor {
    fn name(&self) -> &'static str {
        "Word"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let mut archive = zip::ZipArchive::new(file).with_context(|| "not a docx archive")?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .with_context(|| "docx has no word/document.xml")?
            .read_to_string(&mut xml)
            .with_context(|| "read word/document.xml")?;
        Ok(paragraphs(&xml)?.join("\n"))
    }
}

/// Collects the text of each top-level body paragraph.
pub fn paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    let mut current: Option<String> = None;
    let mut nested = 0usize;
    let mut in_text = false;
    let mut run_depth = 0usize;

    loop {
        match reader.read_event().with_context(|| "parse document.xml")? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tbl" | b"w:txbxContent" => nested += 1,
                b"w:p" if nested == 0 => current = Some(String::new()),
                b"w:r" => run_depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => {
                // Tab stops under w:pPr are layout, not text.
                if let Some(p) = current.as_mut().filter(|_| nested == 0) {
                    match e.name().as_ref() {
                        b"w:tab" if run_depth > 0 => p.push('\t'),
                        b"w:br" | b"w:cr" if run_depth > 0 => p.push('\n'),
                        _ => {}
                    }
                } else if nested == 0 && e.name().as_ref() == b"w:p" {
                    out.push(String::new());
                }
            }
            Event::Text(t) if in_text && nested == 0 => {
                if let Some(p) = current.as_mut() {
                    p.push_str(&t.unescape().with_context(|| "unescape text run")?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:tbl" | b"w:txbxContent" => nested = nested.saturating_sub(1),
                b"w:p" if nested == 0 => {
                    if let Some(p) = current.take() {
                        out.push(p);
                    }
                }
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}
