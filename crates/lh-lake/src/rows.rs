//! Row synthesis and value binding.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use lh_config::{FieldType, TableSchema};
use lh_core::ResourceRecord;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::LakeError;

/// A row ready to be appended.
///
/// Every row gets a fresh `row_id` and is stamped with its ingestion
/// instant; `ingest_month` is the `YYYY-MM` bucket of that instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub row_id: String,
    /// RFC 3339, millisecond precision, UTC.
    pub ingested_at: String,
    pub ingest_month: String,
    pub fields: Map<String, Value>,
}

impl TableRow {
    #[must_use]
    pub fn new(fields: Map<String, Value>, now: DateTime<Utc>) -> Self {
        Self {
            row_id: uuid::Uuid::new_v4().to_string(),
            ingested_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            ingest_month: now.format("%Y-%m").to_string(),
            fields,
        }
    }

    /// Map a remote resource onto the schema's columns via each field's `source` key.
    ///
    /// Columns whose source key the resource lacks are stored as NULL.
    #[must_use]
    pub fn from_resource(schema: &TableSchema, resource: &ResourceRecord, now: DateTime<Utc>) -> Self {
        let fields = schema
            .fields
            .iter()
            .map(|field| {
                (
                    field.name.clone(),
                    resource.field(field.source_key()).unwrap_or(Value::Null),
                )
            })
            .collect();
        Self::new(fields, now)
    }

    #[must_use]
    pub fn get(&self, column: &str) -> &Value {
        self.fields.get(column).unwrap_or(&Value::Null)
    }
}

/// Render a JSON value as the text parameter bound for a column of `kind`.
///
/// Parameters are bound as text and cast in SQL (`?::BIGINT` etc.), so this
/// only has to produce a string `DuckDB` can cast. Epoch-millisecond numbers
/// are accepted for timestamp columns.
pub(crate) fn bind_value(
    column: &str,
    kind: FieldType,
    value: &Value,
) -> Result<Option<String>, LakeError> {
    let invalid = |reason: &str| LakeError::InvalidValue {
        column: column.to_string(),
        reason: reason.to_string(),
    };

    match (kind, value) {
        (_, Value::Null) => Ok(None),
        (FieldType::Json, other) => Ok(Some(other.to_string())),
        (_, Value::String(s)) => Ok(Some(s.clone())),
        (FieldType::Timestamp, Value::Number(n)) => {
            let millis = n
                .as_i64()
                .ok_or_else(|| invalid("timestamp numbers must be integral epoch milliseconds"))?;
            let instant = Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| invalid("epoch milliseconds out of range"))?;
            Ok(Some(instant.format("%Y-%m-%d %H:%M:%S%.3f").to_string()))
        }
        (FieldType::String | FieldType::Integer | FieldType::Double, Value::Number(n)) => {
            Ok(Some(n.to_string()))
        }
        (FieldType::String | FieldType::Boolean, Value::Bool(b)) => Ok(Some(b.to_string())),
        (_, Value::Array(_) | Value::Object(_)) => {
            Err(invalid("nested values need a json column"))
        }
        (kind, other) => Err(invalid(&format!("{other} does not fit a {kind:?} column"))),
    }
}

/// Text form of a value used as `partition_key`.
pub(crate) fn partition_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn new_row_is_stamped() {
        let row = TableRow::new(Map::new(), at("2025-02-03T04:05:06.789Z"));
        assert_eq!(row.ingested_at, "2025-02-03T04:05:06.789Z");
        assert_eq!(row.ingest_month, "2025-02");
        assert_eq!(row.row_id.len(), 36);
    }

    #[test]
    fn row_ids_are_unique() {
        let now = at("2025-02-03T00:00:00Z");
        let a = TableRow::new(Map::new(), now);
        let b = TableRow::new(Map::new(), now);
        assert_ne!(a.row_id, b.row_id);
    }

    #[test]
    fn from_resource_follows_source_keys() {
        let schema: TableSchema = serde_json::from_value(json!({
            "fields": [
                {"name": "file_id", "type": "string", "source": "id"},
                {"name": "modified", "type": "timestamp", "source": "$modifiedDate"},
                {"name": "path", "type": "string", "source": "$path"}
            ],
            "track": ["file_id"]
        }))
        .unwrap();
        let resource: ResourceRecord = serde_json::from_value(json!({
            "id": "a", "name": "Proj1", "$modifiedDate": 1_738_368_000_000_i64, "type": "project"
        }))
        .unwrap();

        let row = TableRow::from_resource(&schema, &resource, at("2025-02-03T00:00:00Z"));
        assert_eq!(row.get("file_id"), &json!("a"));
        assert_eq!(row.get("modified"), &json!(1_738_368_000_000_i64));
        assert_eq!(row.get("path"), &Value::Null);
    }

    #[rstest]
    #[case(FieldType::String, json!("x"), Some("x"))]
    #[case(FieldType::String, json!(12), Some("12"))]
    #[case(FieldType::Integer, json!(42), Some("42"))]
    #[case(FieldType::Integer, json!("42"), Some("42"))]
    #[case(FieldType::Double, json!(1.5), Some("1.5"))]
    #[case(FieldType::Boolean, json!(true), Some("true"))]
    #[case(FieldType::Timestamp, json!(1_738_368_000_000_i64), Some("2025-02-01 00:00:00.000"))]
    #[case(FieldType::Timestamp, json!("2025-02-01 00:00:00"), Some("2025-02-01 00:00:00"))]
    #[case(FieldType::Json, json!({"a": 1}), Some(r#"{"a":1}"#))]
    #[case(FieldType::Integer, Value::Null, None)]
    fn binds_values(#[case] kind: FieldType, #[case] value: Value, #[case] expected: Option<&str>) {
        assert_eq!(
            bind_value("c", kind, &value).unwrap(),
            expected.map(str::to_string)
        );
    }

    #[rstest]
    #[case(FieldType::Integer, json!(true))]
    #[case(FieldType::String, json!([1]))]
    #[case(FieldType::Timestamp, json!(1.5))]
    fn rejects_mismatched_values(#[case] kind: FieldType, #[case] value: Value) {
        assert!(matches!(
            bind_value("c", kind, &value),
            Err(LakeError::InvalidValue { .. })
        ));
    }
}
