//! Remote resource records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of a BIMcloud resource.
///
/// Only projects and libraries are tracked by default; anything else the
/// server reports is kept as [`ResourceType::Other`] rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Project,
    Library,
    #[serde(other)]
    Other,
}

impl ResourceType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Library => "library",
            Self::Other => "other",
        }
    }
}

/// A resource as returned by `get-resources-by-criterion`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Server-assigned unique id.
    pub id: String,
    pub name: String,
    /// Last modification instant, epoch milliseconds.
    #[serde(rename = "$modifiedDate")]
    pub modified_date: i64,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    /// Every other field the server sent, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceRecord {
    /// Look up a field by its wire name, including the well-known ones.
    ///
    /// Used when mapping resources onto table columns.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "id" => Some(Value::String(self.id.clone())),
            "name" => Some(Value::String(self.name.clone())),
            "$modifiedDate" | "modifiedDate" => Some(Value::from(self.modified_date)),
            "type" => Some(Value::String(self.kind.as_str().to_string())),
            other => self.extra.get(other).cloned(),
        }
    }
}
