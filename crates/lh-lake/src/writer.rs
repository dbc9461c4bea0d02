//! Append-only writes with key-column deduplication.
//!
//! A batch is staged in a temporary table, collapsed to one row per key, and
//! anti-joined against the target table; only the remaining rows are
//! inserted, tagged with the next table version. Nothing already stored is
//! ever updated or deleted.

use chrono::{SecondsFormat, Utc};
use duckdb::params;
use lh_config::TableSchema;

use crate::rows::{bind_value, partition_text};
use crate::schemas::{self, LEADING_COLUMNS, STAGE_TABLE, quote};
use crate::{LakeError, LakeStore, TableRow};

impl LakeStore {
    /// Append the rows of `rows` whose `key_columns` values are not yet in `table`.
    ///
    /// A table that does not exist yet is created from `schema` (version 0)
    /// and treated as empty. Rows sharing a key within the batch collapse to
    /// the first one. Returns the number of rows written; zero is a valid
    /// outcome and records no new version.
    ///
    /// # Errors
    ///
    /// - [`LakeError::InvalidKey`] if `key_columns` is empty or names a column
    ///   that is not a schema field
    /// - [`LakeError::InvalidSchema`] for a bad table name or schema
    /// - [`LakeError::InvalidValue`] if a row value does not fit its column
    /// - [`LakeError::DuckDb`] if any statement fails; the whole append is
    ///   rolled back
    pub fn append(
        &self,
        table: &str,
        schema: &TableSchema,
        key_columns: &[String],
        rows: &[TableRow],
    ) -> Result<usize, LakeError> {
        schemas::check_table_name(table)?;
        schema
            .validate()
            .map_err(|e| LakeError::InvalidSchema(e.to_string()))?;
        if key_columns.is_empty() {
            return Err(LakeError::InvalidKey("no key columns given".into()));
        }
        if let Some(unknown) = key_columns.iter().find(|k| schema.field(k).is_none()) {
            return Err(LakeError::InvalidKey(format!(
                "'{unknown}' is not a column of {table}"
            )));
        }

        if rows.is_empty() {
            tracing::debug!(table, "empty batch, nothing to append");
            return Ok(0);
        }

        self.conn.execute_batch("BEGIN TRANSACTION")?;
        match self.append_in_transaction(table, schema, key_columns, rows) {
            Ok(written) => {
                self.conn.execute_batch("COMMIT")?;
                tracing::info!(table, staged = rows.len(), written, "append complete");
                Ok(written)
            }
            Err(error) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!(table, %rollback, "rollback failed");
                }
                Err(error)
            }
        }
    }

    fn append_in_transaction(
        &self,
        table: &str,
        schema: &TableSchema,
        key_columns: &[String],
        rows: &[TableRow],
    ) -> Result<usize, LakeError> {
        if !self.table_exists(table)? {
            self.conn
                .execute_batch(&schemas::create_table_sql(table, schema))?;
            self.record_commit(table, 0, "CREATE TABLE", 0)?;
            tracing::info!(table, "created table");
        }

        self.stage(table, schema, rows)?;

        let version = self.current_version(table)?.map_or(0, |v| v + 1);
        let written = self.insert_delta(table, schema, key_columns, version)?;
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {STAGE_TABLE}"))?;

        if written > 0 {
            self.record_commit(table, version, "APPEND", written)?;
        }
        Ok(written)
    }

    /// Load the batch into a fresh temp table shaped like `table`.
    ///
    /// The stage's `_version` column holds each row's position in the batch.
    fn stage(&self, table: &str, schema: &TableSchema, rows: &[TableRow]) -> Result<(), LakeError> {
        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE TEMP TABLE {STAGE_TABLE} AS SELECT * FROM {} LIMIT 0",
            quote(table)
        ))?;

        let mut columns: Vec<String> = LEADING_COLUMNS.iter().map(|c| (*c).to_string()).collect();
        let mut placeholders = vec!["?".to_string(); LEADING_COLUMNS.len()];
        for field in &schema.fields {
            columns.push(quote(&field.name));
            placeholders.push(format!("?::{}", schemas::sql_type(field.kind)));
        }
        columns.push("_version".to_string());
        placeholders.push("?::BIGINT".to_string());

        let mut stmt = self.conn.prepare(&format!(
            "INSERT INTO {STAGE_TABLE} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        ))?;

        let partition_column = schema.partition_column();
        for (ordinal, row) in rows.iter().enumerate() {
            let mut values: Vec<Option<String>> = vec![
                Some(row.row_id.clone()),
                Some(row.ingested_at.clone()),
                Some(row.ingest_month.clone()),
                partition_column.and_then(|c| partition_text(row.get(c))),
            ];
            for field in &schema.fields {
                values.push(bind_value(&field.name, field.kind, row.get(&field.name))?);
            }
            values.push(Some(ordinal.to_string()));
            stmt.execute(duckdb::params_from_iter(values))?;
        }
        Ok(())
    }

    /// `INSERT ... SELECT` the staged rows whose keys are absent from `table`.
    fn insert_delta(
        &self,
        table: &str,
        schema: &TableSchema,
        key_columns: &[String],
        version: i64,
    ) -> Result<usize, LakeError> {
        let mut columns: Vec<String> = LEADING_COLUMNS.iter().map(|c| (*c).to_string()).collect();
        columns.extend(schema.fields.iter().map(|f| quote(&f.name)));
        let column_list = columns.join(", ");

        let partition_by = key_columns
            .iter()
            .map(|k| quote(k))
            .collect::<Vec<_>>()
            .join(", ");
        let key_match = key_columns
            .iter()
            .map(|k| {
                let k = quote(k);
                format!("e.{k} IS NOT DISTINCT FROM s.{k}")
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        let sql = format!(
            "INSERT INTO {table_q} ({column_list}, _version)
             SELECT {column_list}, ?
             FROM (
                 SELECT * FROM {STAGE_TABLE}
                 QUALIFY row_number() OVER (PARTITION BY {partition_by} ORDER BY _version) = 1
             ) s
             WHERE NOT EXISTS (
                 SELECT 1 FROM {table_q} e WHERE {key_match}
             )",
            table_q = quote(table),
        );
        Ok(self.conn.execute(&sql, params![version])?)
    }

    fn record_commit(
        &self,
        table: &str,
        version: i64,
        operation: &str,
        rows_written: usize,
    ) -> Result<(), LakeError> {
        let committed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let rows_written = i64::try_from(rows_written).unwrap_or(i64::MAX);
        self.conn.execute(
            "INSERT INTO _lake_commits (table_name, version, committed_at, operation, rows_written)
             VALUES (?, ?, ?, ?, ?)",
            params![table, version, committed_at, operation, rows_written],
        )?;
        Ok(())
    }
}
