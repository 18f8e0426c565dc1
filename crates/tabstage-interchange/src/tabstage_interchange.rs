//! Tabstage tabular interchange
//!
//! Turns raw tabular input into `(headers, rows)` and rows back into text.
//! Parsing itself is delegated to the `csv` and `calamine` crates; this crate
//! only applies the staging conventions on top of them.
//!
//! ```text
//! bytes ─┬─ delimited::parse_delimited ─┐
//!        └─ sheet::parse_sheet ─────────┴─ tabular::build_table ─→ ParsedTable
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let table = parse_delimited(b"a,b\n1,2\n", &DelimitedOptions::default())?;
//! assert_eq!(table.headers, vec!["a", "b"]);
//! assert_eq!(table.rows.len(), 1);
//! ```

mod delimited;
mod sheet;
mod tabular;

pub use delimited::{DelimitedOptions, parse_delimited, parse_separator, write_delimited};
pub use sheet::{list_sheets, parse_sheet};
pub use tabular::{ParsedTable, Record, TabularError, build_table, normalize_headers};
