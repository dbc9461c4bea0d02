//! Boolean criterion expressions understood by the BIMcloud resource query.
//!
//! The wire form is a nested JSON object keyed by operator:
//!
//! ```json
//! {"$and": [
//!     {"$gte": {"$modifiedDate": 1735689600000}},
//!     {"$or": [{"$eq": {"type": "project"}}, {"$eq": {"type": "library"}}]}
//! ]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::CoreError;
use crate::resource::ResourceType;

/// A criterion expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Criterion {
    Eq { field: String, value: Value },
    Gte { field: String, value: Value },
    And(Vec<Criterion>),
    Or(Vec<Criterion>),
}

impl Criterion {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `type` is any of `kinds`.
    #[must_use]
    pub fn type_in(kinds: &[ResourceType]) -> Self {
        Self::Or(
            kinds
                .iter()
                .map(|kind| Self::eq("type", kind.as_str()))
                .collect(),
        )
    }

    /// Resources modified at or after `epoch_millis`.
    #[must_use]
    pub fn modified_since(epoch_millis: i64) -> Self {
        Self::gte("$modifiedDate", epoch_millis)
    }

    /// Criterion used when a caller does not supply one: projects and libraries.
    #[must_use]
    pub fn default_types() -> Self {
        Self::type_in(&[ResourceType::Project, ResourceType::Library])
    }

    /// Conjunction of `self` and `other`, flattening nested `$and`s.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let mut terms = match self {
            Self::And(terms) => terms,
            single => vec![single],
        };
        match other {
            Self::And(more) => terms.extend(more),
            single => terms.push(single),
        }
        Self::And(terms)
    }

    fn comparison(op: &str, field: &str, value: Value) -> Value {
        let mut inner = Map::new();
        inner.insert(field.to_string(), value);
        let mut outer = Map::new();
        outer.insert(op.to_string(), Value::Object(inner));
        Value::Object(outer)
    }

    fn combinator(op: &str, terms: Vec<Self>) -> Value {
        let mut outer = Map::new();
        outer.insert(
            op.to_string(),
            Value::Array(terms.into_iter().map(Value::from).collect()),
        );
        Value::Object(outer)
    }
}

impl From<Criterion> for Value {
    fn from(criterion: Criterion) -> Self {
        match criterion {
            Criterion::Eq { field, value } => Criterion::comparison("$eq", &field, value),
            Criterion::Gte { field, value } => Criterion::comparison("$gte", &field, value),
            Criterion::And(terms) => Criterion::combinator("$and", terms),
            Criterion::Or(terms) => Criterion::combinator("$or", terms),
        }
    }
}

impl TryFrom<Value> for Criterion {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(map) = value else {
            return Err(CoreError::InvalidCriterion(format!(
                "expected an object, got {value}"
            )));
        };
        let mut entries = map.into_iter();
        let (Some((op, operand)), None) = (entries.next(), entries.next()) else {
            return Err(CoreError::InvalidCriterion(
                "expected exactly one operator key".into(),
            ));
        };

        match op.as_str() {
            "$and" | "$or" => {
                let Value::Array(items) = operand else {
                    return Err(CoreError::InvalidCriterion(format!(
                        "'{op}' expects an array of criteria"
                    )));
                };
                if items.is_empty() {
                    return Err(CoreError::InvalidCriterion(format!(
                        "'{op}' needs at least one term"
                    )));
                }
                let terms = items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(if op == "$and" {
                    Self::And(terms)
                } else {
                    Self::Or(terms)
                })
            }
            "$eq" | "$gte" => {
                let Value::Object(fields) = operand else {
                    return Err(CoreError::InvalidCriterion(format!(
                        "'{op}' expects a single-field object"
                    )));
                };
                let mut fields = fields.into_iter();
                let (Some((field, value)), None) = (fields.next(), fields.next()) else {
                    return Err(CoreError::InvalidCriterion(format!(
                        "'{op}' expects exactly one field"
                    )));
                };
                Ok(if op == "$eq" {
                    Self::Eq { field, value }
                } else {
                    Self::Gte { field, value }
                })
            }
            other => Err(CoreError::InvalidCriterion(format!(
                "unsupported operator '{other}'"
            ))),
        }
    }
}
