//! # lh-lake
//!
//! Append-only versioned tables on a local `DuckDB` file.
//!
//! Every data table is generated from a [`lh_config::TableSchema`] and carries
//! four store-managed columns (`row_id`, `ingested_at`, `ingest_month`,
//! `partition_key`) plus a `_version` column recording the append that wrote
//! each row. Versions are logged per table in `_lake_commits`: version 0 is
//! the `CREATE TABLE`, and every append that writes at least one row adds the
//! next version. Appends never update or delete; rows whose key columns are
//! already present are skipped.
//!
//! Partitioning is logical: rows are tagged with the partition column's value
//! and their ingestion month, and an index covers both.

mod error;
mod history;
mod rows;
pub mod schemas;
mod writer;

pub use error::LakeError;
pub use history::CommitInfo;
pub use rows::TableRow;

use std::path::Path;

use duckdb::Connection;

/// Local `DuckDB` table store.
pub struct LakeStore {
    conn: Connection,
}

impl LakeStore {
    /// Open or create a store file, creating its parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::Io`] if the directory cannot be created, or
    /// [`LakeError::DuckDb`] if the file cannot be opened (for instance when
    /// another process holds its lock).
    pub fn open_local(path: &Path) -> Result<Self, LakeError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        tracing::debug!(path = %path.display(), "opened table store");
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::DuckDb`] if schema creation fails.
    pub fn open_in_memory() -> Result<Self, LakeError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Access the underlying `DuckDB` connection.
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn init_schema(&self) -> Result<(), LakeError> {
        self.conn.execute_batch(schemas::CREATE_COMMITS)?;
        Ok(())
    }
}
