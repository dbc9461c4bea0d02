//! Lake error types.

/// Errors that can occur in the table store.
#[derive(Debug, thiserror::Error)]
pub enum LakeError {
    /// `DuckDB` operation failed.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// A read was attempted on a table that has never been written.
    ///
    /// The writer treats a missing table as empty and creates it, so this
    /// only surfaces from the read-side helpers.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Key columns are empty or not part of the table schema.
    #[error("Invalid key columns: {0}")]
    InvalidKey(String),

    /// The table name or schema cannot be turned into DDL.
    #[error("Invalid table schema: {0}")]
    InvalidSchema(String),

    /// A row value does not fit its column type.
    #[error("Invalid value for column '{column}': {reason}")]
    InvalidValue {
        /// Column name.
        column: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// I/O error (creating the directory of a `DuckDB` file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
