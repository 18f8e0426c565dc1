//! SQL text builders for staged tables

use crate::dataset::ColumnSpec;

/// Quote an identifier for SQLite, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn create_table_sql(table: &str, schema: &[ColumnSpec], strict: bool) -> String {
    let columns = schema
        .iter()
        .map(|c| format!("{} {}", quote_identifier(&c.name), c.declared_type.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let suffix = if strict { " STRICT" } else { "" };
    format!("CREATE TABLE {} ({}){}", quote_identifier(table), columns, suffix)
}

/// Parameterized INSERT binding columns in schema order as `?1..?n`
pub fn insert_sql(table: &str, schema: &[ColumnSpec]) -> String {
    let columns = schema
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=schema.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns,
        placeholders
    )
}

pub fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_identifier(table))
}

/// Rows in insertion order, optionally capped at `limit`
pub fn select_rows_sql(table: &str, limit: Option<usize>) -> String {
    let mut sql = format!("SELECT * FROM {} ORDER BY rowid", quote_identifier(table));
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(table))
}
