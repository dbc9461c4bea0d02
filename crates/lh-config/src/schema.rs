//! Table schema files.
//!
//! A schema file lists the domain columns of a table and the key columns
//! (`track`) used to decide whether an incoming row is already stored:
//!
//! ```json
//! {
//!     "fields": [
//!         {"name": "file_id", "type": "string", "source": "id"},
//!         {"name": "file_name", "type": "string", "source": "name"},
//!         {"name": "modified", "type": "timestamp", "source": "$modifiedDate"}
//!     ],
//!     "track": ["file_id", "modified"],
//!     "partition": "file_id"
//! }
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Columns every stored row carries in addition to its domain fields.
pub const RESERVED_COLUMNS: &[&str] = &[
    "row_id",
    "ingested_at",
    "ingest_month",
    "partition_key",
    "_version",
];

/// Column type of a domain field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[serde(alias = "varchar", alias = "text")]
    String,
    #[serde(alias = "long", alias = "bigint", alias = "int")]
    Integer,
    #[serde(alias = "float")]
    Double,
    #[serde(alias = "bool")]
    Boolean,
    Timestamp,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    /// Key to read from the source record. Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl FieldSpec {
    #[must_use]
    pub fn source_key(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub fields: Vec<FieldSpec>,
    /// Key columns for change detection.
    pub track: Vec<String>,
    /// Natural-id partition column. Defaults to the first tracked column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl TableSchema {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The column whose value becomes a row's `partition_key`.
    #[must_use]
    pub fn partition_column(&self) -> Option<&str> {
        self.partition
            .as_deref()
            .or_else(|| self.track.first().map(String::as_str))
    }

    /// Check the schema is usable as a table definition.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when there are no fields, a field
    /// name is not a plain identifier or collides with a reserved column,
    /// names repeat, `track` is empty or names an unknown field, or
    /// `partition` names an unknown field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fields.is_empty() {
            return Err(invalid("fields", "schema declares no fields"));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !is_identifier(&field.name) {
                return Err(invalid(
                    "fields",
                    &format!("'{}' is not a valid column name", field.name),
                ));
            }
            if RESERVED_COLUMNS.contains(&field.name.as_str()) {
                return Err(invalid(
                    "fields",
                    &format!("'{}' is a reserved column", field.name),
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(invalid(
                    "fields",
                    &format!("'{}' is declared twice", field.name),
                ));
            }
        }

        if self.track.is_empty() {
            return Err(invalid("track", "at least one key column is required"));
        }
        if let Some(unknown) = self.track.iter().find(|k| !seen.contains(k.as_str())) {
            return Err(invalid(
                "track",
                &format!("'{unknown}' is not a declared field"),
            ));
        }
        if let Some(partition) = &self.partition
            && !seen.contains(partition.as_str())
        {
            return Err(invalid(
                "partition",
                &format!("'{partition}' is not a declared field"),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
