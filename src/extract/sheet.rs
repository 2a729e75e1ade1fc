use super::Extractor;
use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, open_workbook_auto};
use std::path::Path;

/// First worksheet of an `.xlsx`/`.xls` workbook as tab-separated rows.
/// Leading blank rows and columns are kept so cells stay on the sheet grid.
/// Other sheets are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetExtractor;

impl Extractor for SpreadsheetExtractor {
    fn name(&self) -> &'static str {
        "Excel"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let mut workbook =
            open_workbook_auto(path).with_context(|| format!("open workbook {}", path.display()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| anyhow!("workbook has no worksheets"))?
            .with_context(|| "read first worksheet")?;

        let (top, left) = range.start().unwrap_or((0, 0));
        let indent = "\t".repeat(left as usize);
        let mut rows = vec![String::new(); top as usize];
        rows.extend(range.rows().map(|row| {
            let cells = row.iter().map(cell_text).collect::<Vec<_>>().join("\t");
            format!("{indent}{cells}")
        }));
        Ok(rows.join("\n"))
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}
