//! # lh-config
//!
//! JSON configuration loading for Lakehouse using figment.
//!
//! Every configuration file belongs to a *scope* (a directory relative to the
//! config root) and has a *name* (the file stem):
//!
//! - `config/general.json`: storage location and table catalog
//! - `scripts/<script>/<script>.json`: per-script settings (server block etc.)
//! - schema files referenced from `tables.<key>.schema`
//!
//! The general scope additionally takes environment overrides with the
//! `LAKEHOUSE_` prefix, `__` separating nested sections
//! (`LAKEHOUSE_STORAGE__PATH` -> `storage.path`).
//!
//! # Usage
//!
//! ```no_run
//! use lh_config::{ConfigStore, ServerConfig};
//!
//! let store = ConfigStore::new(".");
//! let general = store.load_general().expect("general config");
//!
//! let doc = store.load("BIMcloud", "scripts/BIMcloud").expect("script config");
//! let server: ServerConfig = doc.extract_inner("server").expect("server block");
//! println!("{}", server.base_url());
//! ```

mod error;
mod general;
mod schema;
mod server;

pub use error::ConfigError;
pub use general::{GeneralConfig, StorageConfig, TableConfig};
pub use schema::{FieldSpec, FieldType, RESERVED_COLUMNS, TableSchema};
pub use server::ServerConfig;

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Json},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Scope of the general configuration file.
pub const GENERAL_SCOPE: &str = "config";
/// Name of the general configuration file.
pub const GENERAL_NAME: &str = "general";
/// Environment prefix applied to the general scope.
pub const ENV_PREFIX: &str = "LAKEHOUSE_";

/// A loaded configuration file.
///
/// Read-only. Fields are reachable either by dotted path ([`field`](Self::field))
/// or through typed, validated extraction ([`extract`](Self::extract)).
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    path: PathBuf,
    figment: Figment,
    raw: Value,
}

impl ConfigDocument {
    /// File this document was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole document as JSON (environment overrides included).
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.raw
    }

    /// Look up a dotted path (`server.url`, `tables.resources.name`).
    ///
    /// Numeric segments index into arrays.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AttributeNotFound`] if any segment is undefined.
    pub fn field(&self, path: &str) -> Result<&Value, ConfigError> {
        let mut current = &self.raw;
        for segment in path.split('.') {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| ConfigError::AttributeNotFound {
                path: path.to_string(),
                file: self.path.clone(),
            })?;
        }
        Ok(current)
    }

    /// Deserialize the whole document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] naming the missing or mistyped field.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        self.figment.extract().map_err(ConfigError::from)
    }

    /// Deserialize the section at `key` (dotted path).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AttributeNotFound`] if the section is absent and
    /// [`ConfigError::Figment`] if it does not match `T`.
    pub fn extract_inner<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        self.field(key)?;
        self.figment.extract_inner(key).map_err(ConfigError::from)
    }

    /// Whether `key` is defined.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.field(key).is_ok()
    }
}

/// Loads configuration documents from a root directory.
///
/// Construct once at startup and pass by reference.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
    env_prefix: Option<String>,
}

impl ConfigStore {
    /// A store rooted at `root`, with `LAKEHOUSE_` environment overrides.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            env_prefix: Some(ENV_PREFIX.to_string()),
        }
    }

    /// A store that ignores the environment (useful in tests).
    pub fn without_env(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            env_prefix: None,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<scope>/<name>.json`.
    #[must_use]
    pub fn path_for(&self, name: &str, scope: &str) -> PathBuf {
        self.root.join(scope).join(format!("{name}.json"))
    }

    /// Load the document `name` in `scope`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] if the file does not exist
    /// - [`ConfigError::Io`] if it cannot be read
    /// - [`ConfigError::Figment`] if it is not valid JSON
    pub fn load(&self, name: &str, scope: &str) -> Result<ConfigDocument, ConfigError> {
        let path = self.path_for(name, scope);
        let with_env = scope == GENERAL_SCOPE && name == GENERAL_NAME;
        self.load_path(path, with_env)
    }

    /// Load the general configuration.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), plus [`ConfigError::Figment`] if the
    /// document does not match [`GeneralConfig`].
    pub fn load_general(&self) -> Result<GeneralConfig, ConfigError> {
        let config: GeneralConfig = self.load(GENERAL_NAME, GENERAL_SCOPE)?.extract()?;
        tracing::debug!(
            tables = config.tables.len(),
            storage = config.storage.is_some(),
            "loaded general config"
        );
        Ok(config)
    }

    /// Load and validate the schema file a table entry points at.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotFound`] if the file is missing, [`ConfigError::Figment`]
    /// if it does not parse, [`ConfigError::InvalidValue`] if it fails validation.
    pub fn load_schema(&self, table: &TableConfig) -> Result<TableSchema, ConfigError> {
        let schema: TableSchema = self
            .load_path(self.root.join(&table.schema), false)?
            .extract()?;
        schema.validate()?;
        Ok(schema)
    }

    fn load_path(&self, path: PathBuf, with_env: bool) -> Result<ConfigDocument, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound { path });
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        let mut figment = Figment::from(Json::string(&content));
        if with_env && let Some(prefix) = &self.env_prefix {
            figment = figment.merge(Env::prefixed(prefix).split("__"));
        }

        // Extracting once surfaces malformed JSON at load time rather than on
        // first access.
        let raw: Value = figment.extract()?;
        tracing::debug!(path = %path.display(), "loaded config document");
        Ok(ConfigDocument { path, figment, raw })
    }
}
