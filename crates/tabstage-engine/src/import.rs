//! Import pipeline
//!
//! Raw bytes go through the parser adapter, receive a unique id and land in
//! the staging cache as one complete dataset. The caller only ever sees the
//! bounded preview.

use serde::{Deserialize, Serialize};
use tabstage_core::Connection;
use tabstage_interchange::{
    DelimitedOptions, ParsedTable, Record, parse_delimited, parse_separator, parse_sheet,
};

use crate::config::{EngineConfig, IdentityStrategy};
use crate::dataset::{PreviewRecord, StagedDataset};
use crate::error::StageResult;
use crate::identity::{IdentityResolver, ResolvedId};
use crate::staging::StagingCache;

const SHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Input container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportFormat {
    Delimited,
    Sheet,
}

impl ImportFormat {
    /// Guess the format from a file name's extension
    pub fn detect(name: &str) -> Self {
        match extension(name) {
            Some(ext) if SHEET_EXTENSIONS.contains(&ext.as_str()) => ImportFormat::Sheet,
            _ => ImportFormat::Delimited,
        }
    }
}

/// One tabular import request
#[derive(Debug, Clone)]
pub struct ImportInput {
    pub bytes: Vec<u8>,
    /// Requested base name, usually the dropped file's name
    pub name: String,
    pub rows_to_skip: usize,
    pub separator: Option<String>,
    /// Detected from `name` when absent
    pub format: Option<ImportFormat>,
    /// Sheet to read; the first sheet when absent
    pub sheet: Option<String>,
}

impl ImportInput {
    pub fn delimited(bytes: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            name: name.into(),
            rows_to_skip: 0,
            separator: None,
            format: None,
            sheet: None,
        }
    }
}

pub struct ImportPipeline {
    preview_rows: usize,
    default_separator: String,
    import_identity: IdentityStrategy,
    sample_identity: IdentityStrategy,
}

impl ImportPipeline {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            preview_rows: config.preview_rows,
            default_separator: config.default_separator.clone(),
            import_identity: config.import_identity,
            sample_identity: config.sample_identity,
        }
    }

    pub fn preview_rows(&self) -> usize {
        self.preview_rows
    }

    /// Parse the input without touching any state
    pub fn parse(&self, input: &ImportInput) -> StageResult<ParsedTable> {
        let format = input.format.unwrap_or_else(|| ImportFormat::detect(&input.name));
        let table = match format {
            ImportFormat::Sheet => {
                parse_sheet(&input.bytes, input.sheet.as_deref(), input.rows_to_skip)?
            }
            ImportFormat::Delimited => {
                let separator = match input.separator.as_deref() {
                    Some(sep) => sep,
                    None if extension(&input.name).as_deref() == Some("tsv") => "\t",
                    None => self.default_separator.as_str(),
                };
                let options = DelimitedOptions {
                    delimiter: parse_separator(separator)?,
                    rows_to_skip: input.rows_to_skip,
                };
                parse_delimited(&input.bytes, &options)?
            }
        };
        Ok(table)
    }

    /// Parse, name and stage an import; returns its preview.
    ///
    /// Stages exactly one dataset on success and nothing on failure.
    #[tracing::instrument(
        skip(self, input, connection, resolver, staging),
        fields(name = %input.name, len = input.bytes.len())
    )]
    pub async fn import_tabular(
        &self,
        input: ImportInput,
        connection: &dyn Connection,
        resolver: &mut IdentityResolver,
        staging: &mut StagingCache,
    ) -> StageResult<PreviewRecord> {
        let table = self.parse(&input)?;

        let format = input.format.unwrap_or_else(|| ImportFormat::detect(&input.name));
        let base = match (&input.sheet, format) {
            (Some(sheet), ImportFormat::Sheet) => sheet.as_str(),
            _ => input.name.as_str(),
        };
        let resolved = resolver
            .resolve(base, self.import_identity, connection, staging)
            .await;

        let preview = self.stage(resolved, input.name, table, staging);
        tracing::info!(id = %preview.id, rows = preview.row_count, "import staged");
        Ok(preview)
    }

    /// Stage a small synthetic dataset
    #[tracing::instrument(skip_all)]
    pub async fn create_sample(
        &self,
        connection: &dyn Connection,
        resolver: &mut IdentityResolver,
        staging: &mut StagingCache,
    ) -> StageResult<PreviewRecord> {
        let resolved = resolver
            .resolve("sample", self.sample_identity, connection, staging)
            .await;
        let preview = self.stage(resolved, "sample".to_string(), sample_table(), staging);
        tracing::info!(id = %preview.id, "sample staged");
        Ok(preview)
    }

    fn stage(
        &self,
        resolved: ResolvedId,
        title: String,
        table: ParsedTable,
        staging: &mut StagingCache,
    ) -> PreviewRecord {
        let dataset = StagedDataset {
            id: resolved.id,
            title,
            headers: table.headers,
            rows: table.rows,
            created_at: resolved.tick,
        };
        let preview = dataset.preview(self.preview_rows);
        staging.put(dataset);
        preview
    }
}

fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn sample_table() -> ParsedTable {
    const CITIES: [&str; 4] = ["Lisbon", "Oslo", "Quito", "Nairobi"];
    let headers: Vec<String> = ["id", "name", "city", "score"]
        .iter()
        .map(|h| h.to_string())
        .collect();

    let rows = (1..=12)
        .map(|n: usize| {
            let values = [
                Some(n.to_string()),
                Some(format!("item {}", n)),
                Some(CITIES[n % CITIES.len()].to_string()),
                // every fifth score left blank
                (n % 5 != 0).then(|| ((n * 37) % 100).to_string()),
            ];
            headers.iter().cloned().zip(values).collect::<Record>()
        })
        .collect();

    ParsedTable { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pipeline() -> ImportPipeline {
        ImportPipeline::new(&EngineConfig::default())
    }

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(ImportFormat::detect("book.XLSX"), ImportFormat::Sheet);
        assert_eq!(ImportFormat::detect("book.ods"), ImportFormat::Sheet);
        assert_eq!(ImportFormat::detect("data.csv"), ImportFormat::Delimited);
        assert_eq!(ImportFormat::detect("noext"), ImportFormat::Delimited);
    }

    #[test]
    fn tsv_files_default_to_tabs() {
        let table = pipeline()
            .parse(&ImportInput::delimited("a\tb\n1\t2\n", "x.tsv"))
            .unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
    }

    #[test]
    fn explicit_separator_wins() {
        let mut input = ImportInput::delimited("a;b\n1;2\n", "x.csv");
        input.separator = Some(";".into());
        let table = pipeline().parse(&input).unwrap();
        assert_eq!(table.rows[0]["b"], Some("2".to_string()));
    }

    #[test]
    fn sample_has_blank_scores() {
        let table = sample_table();
        assert_eq!(table.row_count(), 12);
        assert_eq!(table.rows[4]["score"], None);
        assert!(table.rows[0]["score"].is_some());
    }
}
