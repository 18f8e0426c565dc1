//! Staged and committed dataset shapes

use serde::{Deserialize, Serialize};
use tabstage_interchange::Record;

/// A fully parsed dataset waiting to be committed
#[derive(Debug, Clone, PartialEq)]
pub struct StagedDataset {
    pub id: String,
    /// Name the caller asked for, kept for display
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
    /// Monotonic microseconds at staging time
    pub created_at: u64,
}

impl StagedDataset {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Build the bounded preview of this dataset
    pub fn preview(&self, limit: usize) -> PreviewRecord {
        PreviewRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            headers: self.headers.clone(),
            row_count: self.rows.len(),
            first_n_rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }
}

/// Read-only excerpt of a staged dataset.
///
/// Never used as commit input; commits always read the staged rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRecord {
    pub id: String,
    pub title: String,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub first_n_rows: Vec<Record>,
}

/// One column of a caller-supplied table schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: String,
    pub declared_type: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    /// A TEXT column for every header, the default shape of a commit
    pub fn text_columns(headers: &[String]) -> Vec<ColumnSpec> {
        headers
            .iter()
            .map(|h| ColumnSpec::new(h.clone(), "TEXT"))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Column layout of one committed table, derived on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub table_name: String,
    pub columns: Vec<CatalogColumn>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dataset(rows: usize) -> StagedDataset {
        StagedDataset {
            id: "d".into(),
            title: "d.csv".into(),
            headers: vec!["n".into()],
            rows: (0..rows)
                .map(|i| Record::from([("n".to_string(), Some(i.to_string()))]))
                .collect(),
            created_at: 0,
        }
    }

    #[test]
    fn preview_is_bounded_and_ordered() {
        let preview = dataset(7).preview(5);
        assert_eq!(preview.row_count, 7);
        assert_eq!(preview.first_n_rows.len(), 5);
        assert_eq!(preview.first_n_rows[4]["n"], Some("4".to_string()));
    }

    #[test]
    fn preview_of_small_dataset_has_every_row() {
        assert_eq!(dataset(2).preview(5).first_n_rows.len(), 2);
    }

    #[test]
    fn preview_serializes_camel_case() {
        let json = serde_json::to_value(dataset(1).preview(5)).unwrap();
        assert_eq!(json["rowCount"], 1);
        assert_eq!(json["firstNRows"][0]["n"], "0");
    }
}
