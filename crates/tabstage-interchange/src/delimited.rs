//! Delimited text (CSV, TSV, ...) reading and writing

use crate::tabular::{ParsedTable, TabularError, build_table};

/// Options for reading delimited text
#[derive(Debug, Clone)]
pub struct DelimitedOptions {
    /// Field separator byte
    pub delimiter: u8,
    /// Number of leading rows to discard before the header row
    pub rows_to_skip: usize,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            rows_to_skip: 0,
        }
    }
}

/// Resolve a user-supplied separator into a delimiter byte.
///
/// Accepts any single ASCII character plus the escapes `\t` and `tab`.
pub fn parse_separator(separator: &str) -> Result<u8, TabularError> {
    match separator {
        "\\t" | "tab" | "\t" => Ok(b'\t'),
        s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        other => Err(TabularError::InvalidSeparator(other.to_string())),
    }
}

/// Parse delimited text into headers and records.
///
/// Input must be UTF-8; a leading byte-order mark is ignored. Rows may have
/// differing field counts.
#[tracing::instrument(skip(bytes), fields(len = bytes.len(), delimiter = %(options.delimiter as char)))]
pub fn parse_delimited(
    bytes: &[u8],
    options: &DelimitedOptions,
) -> Result<ParsedTable, TabularError> {
    let text = std::str::from_utf8(bytes).map_err(|e| TabularError::Decode(e.to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(text.as_bytes());

    // The reader skips empty lines; pad them back in so row positions match
    // line numbers and `rows_to_skip` counts every physical line.
    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| TabularError::Malformed {
            line: e.position().map(|p| p.line()),
            message: e.to_string(),
        })?;
        if let Some(position) = record.position() {
            let preceding = position.line().saturating_sub(1) as usize;
            while raw_rows.len() < preceding {
                raw_rows.push(Vec::new());
            }
        }
        raw_rows.push(record.iter().map(str::to_string).collect());
    }

    build_table(raw_rows, options.rows_to_skip)
}

/// Write a header row followed by data rows as delimited text.
///
/// `None` cells are written as empty fields; fields are quoted only when
/// needed.
pub fn write_delimited<I>(headers: &[String], rows: I, delimiter: u8) -> Result<String, TabularError>
where
    I: IntoIterator<Item = Vec<Option<String>>>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(headers)
        .map_err(|e| TabularError::Write(e.to_string()))?;
    for row in rows {
        writer
            .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .map_err(|e| TabularError::Write(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TabularError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| TabularError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_headers_and_rows() {
        let table = parse_delimited(
            b"a,b,c\n1,2,3\n4,,6\n",
            &DelimitedOptions::default(),
        )
        .unwrap();
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[1]["b"], None);
        assert_eq!(table.rows[1]["c"], Some("6".to_string()));
    }

    #[test]
    fn honors_separator_and_skip() {
        let options = DelimitedOptions {
            delimiter: b';',
            rows_to_skip: 1,
        };
        let table = parse_delimited(b"exported by tool\nx;y\n\"a;b\";2\n", &options).unwrap();
        assert_eq!(table.headers, vec!["x", "y"]);
        assert_eq!(table.rows[0]["x"], Some("a;b".to_string()));
    }

    #[test]
    fn blank_lines_count_as_skipped_rows() {
        let options = DelimitedOptions {
            delimiter: b',',
            rows_to_skip: 2,
        };
        let table =
            parse_delimited(b"Exported report\n\nregion,units\nnorth,3\n", &options).unwrap();
        assert_eq!(table.headers, vec!["region", "units"]);
        assert_eq!(table.rows[0]["units"], Some("3".to_string()));
    }

    #[test]
    fn strips_byte_order_mark() {
        let table = parse_delimited(
            "\u{feff}name\nada\n".as_bytes(),
            &DelimitedOptions::default(),
        )
        .unwrap();
        assert_eq!(table.headers, vec!["name"]);
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = parse_delimited(&[b'a', b'\n', 0xff, 0xfe], &DelimitedOptions::default())
            .unwrap_err();
        assert!(matches!(err, TabularError::Decode(_)));
    }

    #[test]
    fn header_only_file_is_an_error() {
        let err = parse_delimited(b"a,b\n", &DelimitedOptions::default()).unwrap_err();
        assert!(matches!(err, TabularError::NoDataRows { .. }));
    }

    #[test]
    fn separator_parsing() {
        assert_eq!(parse_separator(",").unwrap(), b',');
        assert_eq!(parse_separator("\\t").unwrap(), b'\t');
        assert_eq!(parse_separator("|").unwrap(), b'|');
        assert!(parse_separator("::").is_err());
        assert!(parse_separator("").is_err());
    }

    #[test]
    fn writes_nulls_as_empty_fields() {
        let text = write_delimited(
            &["a".to_string(), "b".to_string()],
            vec![
                vec![Some("1".to_string()), None],
                vec![Some("x,y".to_string()), Some("2".to_string())],
            ],
            b',',
        )
        .unwrap();
        assert_eq!(text, "a,b\n1,\n\"x,y\",2\n");
    }

    #[test]
    fn written_text_parses_back() {
        let headers = vec!["name".to_string(), "note".to_string()];
        let text = write_delimited(
            &headers,
            vec![vec![Some("ada".to_string()), Some("said \"hi\"".to_string())]],
            b'\t',
        )
        .unwrap();
        let options = DelimitedOptions {
            delimiter: b'\t',
            rows_to_skip: 0,
        };
        let table = parse_delimited(text.as_bytes(), &options).unwrap();
        assert_eq!(table.headers, headers);
        assert_eq!(table.rows[0]["note"], Some("said \"hi\"".to_string()));
    }
}
