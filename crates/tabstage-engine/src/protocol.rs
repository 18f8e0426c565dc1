//! Request and response messages
//!
//! Messages are JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "commit", "correlationId": 7, "id": "sales", "schema": [{"name": "a", "declaredType": "TEXT"}]}
//! {"type": "committed", "correlationId": 7, "success": true, "tableName": "sales", "rowCount": 7}
//! ```
//!
//! Byte payloads travel as standard base64 strings.

use serde::{Deserialize, Serialize};

use crate::catalog::TablePreview;
use crate::commit::CommitOutcome;
use crate::dataset::{CatalogEntry, ColumnSpec, PreviewRecord};
use crate::error::{ErrorKind, StageError};
use crate::import::{ImportFormat, ImportInput};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Request {
    Readiness,
    Import {
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
        name: String,
        #[serde(default)]
        rows_to_skip: usize,
        #[serde(default)]
        separator: Option<String>,
        #[serde(default)]
        format: Option<ImportFormat>,
        #[serde(default)]
        sheet: Option<String>,
    },
    ListSheets {
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
    CreateSample {
        /// Opaque to the engine, echoed back on the preview
        #[serde(default)]
        position: Option<serde_json::Value>,
    },
    Commit {
        id: String,
        schema: Vec<ColumnSpec>,
        #[serde(default)]
        target_name: Option<String>,
    },
    Discard {
        id: String,
    },
    ListStaged,
    ListTables,
    DescribeSchema,
    DropTable {
        table: String,
    },
    PreviewTable {
        table: String,
        #[serde(default)]
        limit: Option<usize>,
    },
    Export,
    ExportTable {
        table: String,
        #[serde(default)]
        separator: Option<String>,
    },
    /// Any request type this engine does not know
    #[serde(other)]
    Unknown,
}

impl Request {
    /// Message type name, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Readiness => "readiness",
            Request::Import { .. } => "import",
            Request::ListSheets { .. } => "list-sheets",
            Request::CreateSample { .. } => "create-sample",
            Request::Commit { .. } => "commit",
            Request::Discard { .. } => "discard",
            Request::ListStaged => "list-staged",
            Request::ListTables => "list-tables",
            Request::DescribeSchema => "describe-schema",
            Request::DropTable { .. } => "drop-table",
            Request::PreviewTable { .. } => "preview-table",
            Request::Export => "export",
            Request::ExportTable { .. } => "export-table",
            Request::Unknown => "unknown",
        }
    }
}

impl From<ImportInput> for Request {
    fn from(input: ImportInput) -> Self {
        Request::Import {
            bytes: input.bytes,
            name: input.name,
            rows_to_skip: input.rows_to_skip,
            separator: input.separator,
            format: input.format,
            sheet: input.sheet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessState {
    Initializing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Response {
    Readiness {
        state: ReadinessState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Preview {
        preview: PreviewRecord,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<serde_json::Value>,
    },
    Committed {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        row_count: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<ErrorKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Tables {
        names: Vec<String>,
    },
    Schema {
        entries: Vec<CatalogEntry>,
    },
    Dropped {
        table: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<ErrorKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Discarded {
        id: String,
        existed: bool,
    },
    Staged {
        datasets: Vec<PreviewRecord>,
    },
    Sheets {
        names: Vec<String>,
    },
    TablePreview {
        table: String,
        columns: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
        row_count: u64,
    },
    Exported {
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
    TableExported {
        table: String,
        text: String,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl Response {
    pub fn error(err: &StageError) -> Self {
        Response::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn committed(outcome: CommitOutcome) -> Self {
        Response::Committed {
            success: true,
            table_name: Some(outcome.table_name),
            row_count: Some(outcome.row_count),
            kind: None,
            message: None,
        }
    }

    pub fn commit_failed(err: &StageError) -> Self {
        Response::Committed {
            success: false,
            table_name: None,
            row_count: None,
            kind: Some(err.kind()),
            message: Some(err.to_string()),
        }
    }

    pub fn dropped(table: String) -> Self {
        Response::Dropped {
            table,
            success: true,
            kind: None,
            message: None,
        }
    }

    pub fn drop_failed(table: String, err: &StageError) -> Self {
        Response::Dropped {
            table,
            success: false,
            kind: Some(err.kind()),
            message: Some(err.to_string()),
        }
    }

    /// Error kind carried by a failure response, if any
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Response::Error { kind, .. } => Some(*kind),
            Response::Committed { kind, .. } | Response::Dropped { kind, .. } => *kind,
            _ => None,
        }
    }
}

impl From<TablePreview> for Response {
    fn from(preview: TablePreview) -> Self {
        Response::TablePreview {
            table: preview.table,
            columns: preview.columns,
            rows: preview.rows,
            row_count: preview.row_count,
        }
    }
}

/// A request plus the caller's correlation id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<u64>,
    #[serde(flatten)]
    pub request: Request,
}

impl Envelope {
    pub fn new(request: Request) -> Self {
        Self {
            correlation_id: None,
            request,
        }
    }

    pub fn with_correlation_id(mut self, id: u64) -> Self {
        self.correlation_id = Some(id);
        self
    }
}

/// A response on its way out; unsolicited events carry no correlation id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<u64>,
    #[serde(flatten)]
    pub response: Response,
}

impl Outbound {
    pub fn reply(correlation_id: Option<u64>, response: Response) -> Self {
        Self {
            correlation_id,
            response,
        }
    }

    pub fn unsolicited(response: Response) -> Self {
        Self {
            correlation_id: None,
            response,
        }
    }
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_import_with_defaults() {
        let envelope: Envelope = serde_json::from_value(json!({
            "type": "import",
            "correlationId": 3,
            "bytes": "YSxiCjEsMgo=",
            "name": "data.csv"
        }))
        .unwrap();
        assert_eq!(envelope.correlation_id, Some(3));
        assert_eq!(
            envelope.request,
            Request::Import {
                bytes: b"a,b\n1,2\n".to_vec(),
                name: "data.csv".into(),
                rows_to_skip: 0,
                separator: None,
                format: None,
                sheet: None,
            }
        );
    }

    #[test]
    fn decodes_commit_fields_in_camel_case() {
        let request: Request = serde_json::from_value(json!({
            "type": "commit",
            "id": "sales",
            "targetName": "sales_2024",
            "schema": [{"name": "a", "declaredType": "TEXT"}]
        }))
        .unwrap();
        assert_eq!(
            request,
            Request::Commit {
                id: "sales".into(),
                schema: vec![ColumnSpec::new("a", "TEXT")],
                target_name: Some("sales_2024".into()),
            }
        );
    }

    #[test]
    fn unknown_types_decode_to_unknown() {
        let envelope: Envelope =
            serde_json::from_value(json!({"type": "reticulate-splines", "correlationId": 1}))
                .unwrap();
        assert_eq!(envelope.request, Request::Unknown);
    }

    #[test]
    fn encodes_committed_without_empty_fields() {
        let outbound = Outbound::reply(
            Some(9),
            Response::committed(CommitOutcome {
                table_name: "sales".into(),
                row_count: 7,
            }),
        );
        assert_eq!(
            serde_json::to_value(&outbound).unwrap(),
            json!({
                "type": "committed",
                "correlationId": 9,
                "success": true,
                "tableName": "sales",
                "rowCount": 7
            })
        );
    }

    #[test]
    fn encodes_errors_with_kind() {
        let response = Response::error(&StageError::DatasetMissing("x".into()));
        assert_eq!(
            serde_json::to_value(Outbound::unsolicited(response)).unwrap(),
            json!({
                "type": "error",
                "kind": "DatasetMissing",
                "message": "No staged dataset with id 'x'"
            })
        );
    }

    #[test]
    fn exported_bytes_are_base64() {
        let json = serde_json::to_value(Response::Exported {
            bytes: vec![0, 1, 2],
        })
        .unwrap();
        assert_eq!(json, json!({"type": "exported", "bytes": "AAEC"}));
    }
}
