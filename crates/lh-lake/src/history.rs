//! Read side: existence, row counts, and the version log.

use duckdb::params;
use serde::Serialize;

use crate::schemas::{self, quote};
use crate::{LakeError, LakeStore};

/// One entry of a table's version log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    pub version: i64,
    /// RFC 3339, UTC.
    pub committed_at: String,
    /// `CREATE TABLE` or `APPEND`.
    pub operation: String,
    pub rows_written: i64,
}

impl LakeStore {
    /// Whether a persistent data table named `table` exists.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::DuckDb`] if the catalog query fails.
    pub fn table_exists(&self, table: &str) -> Result<bool, LakeError> {
        let count: i64 = self.conn.query_row(
            "SELECT count(*) FROM duckdb_tables() WHERE table_name = ? AND NOT temporary",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Number of rows currently in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::TableNotFound`] if the table has never been written.
    pub fn count_rows(&self, table: &str) -> Result<u64, LakeError> {
        self.require(table)?;
        let count: i64 = self.conn.query_row(
            &format!("SELECT count(*) FROM {}", quote(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count.unsigned_abs())
    }

    /// Number of rows `table` held right after `version` was committed.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::TableNotFound`] if the table has never been written.
    pub fn count_rows_as_of(&self, table: &str, version: i64) -> Result<u64, LakeError> {
        self.require(table)?;
        let count: i64 = self.conn.query_row(
            &format!("SELECT count(*) FROM {} WHERE _version <= ?", quote(table)),
            params![version],
            |row| row.get(0),
        )?;
        Ok(count.unsigned_abs())
    }

    /// Latest committed version of `table`, or `None` if it was never created.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::DuckDb`] if the commit log cannot be read.
    pub fn current_version(&self, table: &str) -> Result<Option<i64>, LakeError> {
        let version: Option<i64> = self.conn.query_row(
            "SELECT max(version) FROM _lake_commits WHERE table_name = ?",
            params![table],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    /// Version log of `table`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LakeError::TableNotFound`] if the table has never been written.
    pub fn history(&self, table: &str) -> Result<Vec<CommitInfo>, LakeError> {
        self.require(table)?;
        let mut stmt = self.conn.prepare(
            "SELECT version, committed_at, operation, rows_written
             FROM _lake_commits WHERE table_name = ?
             ORDER BY version DESC",
        )?;
        let commits = stmt
            .query_map(params![table], |row| {
                Ok(CommitInfo {
                    version: row.get(0)?,
                    committed_at: row.get(1)?,
                    operation: row.get(2)?,
                    rows_written: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(commits)
    }

    fn require(&self, table: &str) -> Result<(), LakeError> {
        schemas::check_table_name(table)?;
        if self.table_exists(table)? {
            Ok(())
        } else {
            Err(LakeError::TableNotFound(table.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use lh_config::TableSchema;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};

    use super::*;
    use crate::TableRow;

    fn schema() -> TableSchema {
        serde_json::from_value(json!({
            "fields": [{"name": "file_id", "type": "string"}],
            "track": ["file_id"]
        }))
        .unwrap()
    }

    fn rows(ids: &[&str]) -> Vec<TableRow> {
        ids.iter()
            .map(|id| {
                let mut fields = Map::new();
                fields.insert("file_id".into(), json!(id));
                TableRow::new(fields, Utc::now())
            })
            .collect()
    }

    #[test]
    fn missing_table_reads() {
        let store = LakeStore::open_in_memory().unwrap();
        assert!(matches!(
            store.count_rows("files"),
            Err(LakeError::TableNotFound(_))
        ));
        assert!(matches!(store.history("files"), Err(LakeError::TableNotFound(_))));
        assert_eq!(store.current_version("files").unwrap(), None);
    }

    #[test]
    fn versions_advance_only_on_writes() {
        let store = LakeStore::open_in_memory().unwrap();
        let keys = vec!["file_id".to_string()];

        store.append("files", &schema(), &keys, &rows(&["a", "b"])).unwrap();
        store.append("files", &schema(), &keys, &rows(&["a"])).unwrap();
        store.append("files", &schema(), &keys, &rows(&["c"])).unwrap();

        let history = store.history("files").unwrap();
        let summary: Vec<(i64, &str, i64)> = history
            .iter()
            .map(|c| (c.version, c.operation.as_str(), c.rows_written))
            .collect();
        assert_eq!(
            summary,
            vec![(2, "APPEND", 1), (1, "APPEND", 2), (0, "CREATE TABLE", 0)]
        );
    }

    #[test]
    fn time_travel_counts() {
        let store = LakeStore::open_in_memory().unwrap();
        let keys = vec!["file_id".to_string()];
        store.append("files", &schema(), &keys, &rows(&["a", "b"])).unwrap();
        store.append("files", &schema(), &keys, &rows(&["c"])).unwrap();

        assert_eq!(store.count_rows_as_of("files", 0).unwrap(), 0);
        assert_eq!(store.count_rows_as_of("files", 1).unwrap(), 2);
        assert_eq!(store.count_rows_as_of("files", 2).unwrap(), 3);
        assert_eq!(store.count_rows("files").unwrap(), 3);
    }

    #[test]
    fn stage_table_is_not_a_data_table() {
        let store = LakeStore::open_in_memory().unwrap();
        store
            .append("files", &schema(), &["file_id".to_string()], &rows(&["a"]))
            .unwrap();
        assert!(!store.table_exists(crate::schemas::STAGE_TABLE).unwrap());
    }
}
