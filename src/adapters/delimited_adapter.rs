//! Delimited export file adapter.
//!
//! Brokers export "spreadsheets" as comma-, semicolon-, or tab-delimited
//! text (sometimes with an .xls extension); the delimiter is sniffed from
//! the header line.

use std::fs;
use std::path::Path;

use crate::domain::error::TradebookError;
use crate::domain::stream::RawSheet;
use crate::ports::row_source_port::RowSourcePort;

pub struct DelimitedFileAdapter;

impl DelimitedFileAdapter {
    pub fn new() -> Self {
        DelimitedFileAdapter
    }
}

impl Default for DelimitedFileAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RowSourcePort for DelimitedFileAdapter {
    fn read_sheets(&self, path: &Path) -> Result<Vec<RawSheet>, TradebookError> {
        let content = fs::read_to_string(path).map_err(|e| TradebookError::Read {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let delimiter = sniff_delimiter(&content);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| TradebookError::Read {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sheet".to_string());

        Ok(vec![RawSheet { name, rows }])
    }
}

/// Count candidate delimiters outside quoted sections of the header line;
/// tabs win outright, otherwise semicolons beat commas on a tie toward
/// commas.
fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().find(|line| !line.trim().is_empty()).unwrap_or("");

    let mut in_quotes = false;
    let mut commas = 0usize;
    let mut semicolons = 0usize;
    let mut tabs = 0usize;
    for ch in header.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => commas += 1,
            ';' if !in_quotes => semicolons += 1,
            '\t' if !in_quotes => tabs += 1,
            _ => {}
        }
    }

    if tabs > commas && tabs > semicolons {
        b'\t'
    } else if semicolons > commas {
        b';'
    } else {
        b','
    }
}
