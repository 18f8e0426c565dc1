//! Shared table shaping for every input format

use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;

/// One data row: column name to cell text, `None` for a blank or missing cell.
///
/// Keys follow header order.
pub type Record = IndexMap<String, Option<String>>;

/// Errors while reading or writing tabular data
#[derive(Debug, Error)]
pub enum TabularError {
    #[error("Input is not valid UTF-8 text: {0}")]
    Decode(String),

    #[error("Malformed input{}: {message}", .line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Malformed { line: Option<u64>, message: String },

    #[error("No header row found after skipping {skipped} row(s)")]
    NoHeader { skipped: usize },

    #[error("No data rows found after skipping {skipped} row(s)")]
    NoDataRows { skipped: usize },

    #[error("Invalid separator '{0}': expected a single ASCII character")]
    InvalidSeparator(String),

    #[error("Spreadsheet error: {0}")]
    Sheet(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Failed to write delimited text: {0}")]
    Write(String),
}

/// Parsed tabular input: unique header names and every data row in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

impl ParsedTable {
    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Shape raw rows into a `ParsedTable`.
///
/// `raw_rows` holds one entry per physical row, blank rows included, so
/// `rows_to_skip` counts rows as the user sees them. The first non-blank
/// row after the skipped ones is the header row and every following row is
/// data. Rows whose cells are all blank are dropped, short rows are padded
/// with `None`, and cells past the last header are ignored. Blank cells
/// (empty or whitespace only) become `None`.
pub fn build_table(
    raw_rows: Vec<Vec<String>>,
    rows_to_skip: usize,
) -> Result<ParsedTable, TabularError> {
    let mut remaining = raw_rows
        .into_iter()
        .skip(rows_to_skip)
        .skip_while(|row| row.iter().all(|cell| is_blank(cell)));

    let header_row = remaining.next().ok_or(TabularError::NoHeader {
        skipped: rows_to_skip,
    })?;
    let headers = normalize_headers(&header_row);

    let rows: Vec<Record> = remaining
        .filter(|row| row.iter().any(|cell| !is_blank(cell)))
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(idx, header)| {
                    let cell = row
                        .get(idx)
                        .filter(|cell| !is_blank(cell))
                        .cloned();
                    (header.clone(), cell)
                })
                .collect()
        })
        .collect();

    if rows.is_empty() {
        return Err(TabularError::NoDataRows {
            skipped: rows_to_skip,
        });
    }

    tracing::debug!(
        columns = headers.len(),
        rows = rows.len(),
        skipped = rows_to_skip,
        "tabular input shaped"
    );
    Ok(ParsedTable { headers, rows })
}

/// Make header names usable as record keys and column names.
///
/// Names are trimmed, blank names become `column_<position>` (1-based) and
/// repeated names get a numeric suffix: `a, a` becomes `a, a_1`.
pub fn normalize_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut headers = Vec::with_capacity(raw.len());

    for (idx, name) in raw.iter().enumerate() {
        let trimmed = name.trim();
        let base = if trimmed.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            trimmed.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate.to_lowercase()) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        seen.insert(candidate.to_lowercase());
        headers.push(candidate);
    }

    headers
}

fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}
