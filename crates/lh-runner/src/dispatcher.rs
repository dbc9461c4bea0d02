//! Named-entry invocation of discovered scripts.

use std::path::PathBuf;

use lh_config::{ConfigDocument, ConfigStore};
use serde_json::{Map, Value};

use crate::registry::{Exposed, SCRIPTS_SCOPE, ScriptCatalog, ScriptRegistry};
use crate::{RunnerError, ScriptError};

/// Entry invoked when the caller names none.
pub const DEFAULT_ENTRY: &str = "execute";

/// Parameter names the dispatcher fills in itself.
pub const RESERVED_PARAMETERS: &[&str] = &["config"];

/// Everything an entry receives.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub script: String,
    pub entry: String,
    /// Config scope of the script, `scripts/<folder>`.
    pub scope: String,
    /// Caller-supplied parameters.
    pub parameters: Map<String, Value>,
    /// The script's own configuration document.
    pub config: ConfigDocument,
    /// Store the configuration was loaded from, for general and schema lookups.
    pub store: ConfigStore,
}

impl Invocation {
    /// A string parameter, `None` if absent or null.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::InvalidParameter`] if the value is not a string.
    pub fn string_parameter(&self, name: &str) -> Result<Option<&str>, ScriptError> {
        match self.parameters.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(ScriptError::InvalidParameter {
                name: name.to_string(),
                reason: format!("expected a string, got {other}"),
            }),
        }
    }

    /// Directory holding the script's manifest and private files.
    #[must_use]
    pub fn script_dir(&self) -> PathBuf {
        self.store.root().join(&self.scope)
    }
}

/// Resolves `script.entry` and runs it with its configuration attached.
pub struct Dispatcher {
    store: ConfigStore,
    registry: ScriptRegistry,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(store: ConfigStore, registry: ScriptRegistry) -> Self {
        Self { store, registry }
    }

    /// Discover the scripts under `<config root>/scripts` and build a dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::ScriptsDirectoryNotFound`] if the directory is missing.
    pub fn discover(store: ConfigStore, catalog: &ScriptCatalog) -> Result<Self, RunnerError> {
        let registry = ScriptRegistry::discover(&store.root().join(SCRIPTS_SCOPE), catalog)?;
        Ok(Self::new(store, registry))
    }

    #[must_use]
    pub const fn registry(&self) -> &ScriptRegistry {
        &self.registry
    }

    /// Invoke `entry` (default [`DEFAULT_ENTRY`]) of `script` once.
    ///
    /// # Errors
    ///
    /// - [`RunnerError::ScriptNotFound`], [`RunnerError::EntryNotFound`],
    ///   [`RunnerError::NotCallable`] when the target cannot be resolved
    /// - [`RunnerError::ReservedParameter`] if `parameters` contains `config`
    /// - [`RunnerError::Config`] if the script configuration cannot be loaded
    /// - [`RunnerError::Script`] wrapping whatever the entry returned
    pub async fn execute(
        &self,
        script: &str,
        entry: Option<&str>,
        parameters: Map<String, Value>,
    ) -> Result<Value, RunnerError> {
        let entry = entry.unwrap_or(DEFAULT_ENTRY);
        let descriptor = self
            .registry
            .get(script)
            .ok_or_else(|| RunnerError::ScriptNotFound(script.to_string()))?;

        let function = match descriptor.entry(entry) {
            Some(Exposed::Function(function)) => *function,
            Some(Exposed::Constant(_)) => {
                return Err(RunnerError::NotCallable {
                    script: script.to_string(),
                    entry: entry.to_string(),
                });
            }
            None => {
                return Err(RunnerError::EntryNotFound {
                    script: script.to_string(),
                    entry: entry.to_string(),
                });
            }
        };

        if let Some(reserved) = RESERVED_PARAMETERS
            .iter()
            .find(|name| parameters.contains_key(**name))
        {
            return Err(RunnerError::ReservedParameter((*reserved).to_string()));
        }

        let config = self.store.load(&descriptor.name, &descriptor.scope)?;

        let invocation = Invocation {
            script: descriptor.name.clone(),
            entry: entry.to_string(),
            scope: descriptor.scope.clone(),
            parameters,
            config,
            store: self.store.clone(),
        };

        tracing::info!(script, entry, "dispatching");
        function(invocation)
            .await
            .map_err(|source| RunnerError::Script {
                script: script.to_string(),
                entry: entry.to_string(),
                source,
            })
    }
}
