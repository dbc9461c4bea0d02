//! General (process-wide) configuration: storage location and table catalog.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Where the table store lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// `DuckDB` file, relative to the config root unless absolute.
    pub path: String,
}

/// One entry of the table catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TableConfig {
    /// Table name inside the store.
    pub name: String,
    /// Schema file, relative to the config root.
    pub schema: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub storage: Option<StorageConfig>,

    /// Tables keyed by the name scripts refer to them with.
    #[serde(default)]
    pub tables: BTreeMap<String, TableConfig>,
}

impl GeneralConfig {
    /// Resolve the storage path against `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] if no `storage` section is present.
    pub fn storage_path(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| ConfigError::NotConfigured {
                section: "storage".into(),
            })?;
        let path = PathBuf::from(&storage.path);
        Ok(if path.is_absolute() {
            path
        } else {
            root.join(path)
        })
    }

    /// Look up a table by its catalog key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] naming `tables.<key>` if absent.
    pub fn table(&self, key: &str) -> Result<&TableConfig, ConfigError> {
        self.tables
            .get(key)
            .ok_or_else(|| ConfigError::NotConfigured {
                section: format!("tables.{key}"),
            })
    }
}
