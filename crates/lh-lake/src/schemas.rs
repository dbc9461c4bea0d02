//! `DuckDB` DDL for the table store.
//!
//! Data tables are generated from a [`TableSchema`]; the commit log is fixed.

use lh_config::{FieldType, TableSchema};

use crate::LakeError;

/// Per-table commit log. One row per table version.
pub const CREATE_COMMITS: &str = "
CREATE TABLE IF NOT EXISTS _lake_commits (
    table_name TEXT NOT NULL,
    version BIGINT NOT NULL,
    committed_at TEXT NOT NULL,
    operation TEXT NOT NULL,
    rows_written BIGINT NOT NULL,
    PRIMARY KEY (table_name, version)
);
";

/// Name of the temporary table batches are staged in before the anti-join.
pub const STAGE_TABLE: &str = "_lake_stage";

/// Columns every data table carries ahead of its domain fields.
pub const LEADING_COLUMNS: &[&str] = &["row_id", "ingested_at", "ingest_month", "partition_key"];

pub const fn sql_type(kind: FieldType) -> &'static str {
    match kind {
        FieldType::String => "TEXT",
        FieldType::Integer => "BIGINT",
        FieldType::Double => "DOUBLE",
        FieldType::Boolean => "BOOLEAN",
        FieldType::Timestamp => "TIMESTAMP",
        FieldType::Json => "JSON",
    }
}

/// Double-quote an identifier.
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Table names must be plain identifiers and not collide with store internals.
pub fn check_table_name(name: &str) -> Result<(), LakeError> {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !plain {
        return Err(LakeError::InvalidSchema(format!(
            "'{name}' is not a valid table name"
        )));
    }
    if name.starts_with("_lake_") {
        return Err(LakeError::InvalidSchema(format!(
            "'{name}' uses the reserved _lake_ prefix"
        )));
    }
    Ok(())
}

/// `CREATE TABLE` plus partition index for a data table.
pub fn create_table_sql(table: &str, schema: &TableSchema) -> String {
    let mut columns = vec![
        "row_id TEXT NOT NULL".to_string(),
        "ingested_at TEXT NOT NULL".to_string(),
        "ingest_month TEXT NOT NULL".to_string(),
        "partition_key TEXT".to_string(),
    ];
    columns.extend(
        schema
            .fields
            .iter()
            .map(|f| format!("{} {}", quote(&f.name), sql_type(f.kind))),
    );
    columns.push("_version BIGINT NOT NULL".to_string());
    columns.push("PRIMARY KEY (row_id)".to_string());

    format!(
        "CREATE TABLE IF NOT EXISTS {table_q} (\n    {cols}\n);\n\
         CREATE INDEX IF NOT EXISTS {index_q} ON {table_q}(partition_key, ingest_month);\n",
        table_q = quote(table),
        cols = columns.join(",\n    "),
        index_q = quote(&format!("idx_{table}_partition")),
    )
}
