//! Script discovery.
//!
//! Scripts are compiled in and listed in a [`ScriptCatalog`]. Which of them
//! are *enabled* is decided by the filesystem: every `scripts/<folder>/<name>.json`
//! manifest whose name matches a catalog entry becomes a [`ScriptDescriptor`].
//! The manifest doubles as the script's configuration document. Stems starting
//! with `_` are private files (tracking state and the like) and are skipped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::{Invocation, RunnerError, ScriptError};

/// Directory under the config root that holds script folders.
pub const SCRIPTS_SCOPE: &str = "scripts";

/// Future returned by a script entry.
pub type EntryFuture = BoxFuture<'static, Result<Value, ScriptError>>;

/// A callable script entry.
pub type EntryFn = fn(Invocation) -> EntryFuture;

/// Something a script exposes under a name.
#[derive(Clone)]
pub enum Exposed {
    Function(EntryFn),
    /// Exposed for inspection; dispatching to it is an error.
    Constant(Value),
}

impl std::fmt::Debug for Exposed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Function(..)"),
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
        }
    }
}

/// Builds the entry table of one script.
pub type ScriptFactory = fn() -> BTreeMap<String, Exposed>;

/// Compiled-in scripts, by name.
#[derive(Debug, Clone, Default)]
pub struct ScriptCatalog {
    factories: BTreeMap<String, ScriptFactory>,
}

impl ScriptCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the script `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, factory: ScriptFactory) -> Self {
        self.factories.insert(name.into(), factory);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ScriptFactory> {
        self.factories.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

/// A discovered, enabled script.
#[derive(Debug, Clone)]
pub struct ScriptDescriptor {
    pub name: String,
    /// Config scope of the script, `scripts/<folder>`.
    pub scope: String,
    pub manifest: PathBuf,
    entries: BTreeMap<String, Exposed>,
}

impl ScriptDescriptor {
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&Exposed> {
        self.entries.get(name)
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// All scripts found under a scripts directory.
#[derive(Debug, Clone)]
pub struct ScriptRegistry {
    root: PathBuf,
    scripts: BTreeMap<String, ScriptDescriptor>,
}

impl ScriptRegistry {
    /// Scan one level of folders under `root` for script manifests.
    ///
    /// A manifest that cannot be read, is not valid JSON, or names a script
    /// the catalog does not know is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::ScriptsDirectoryNotFound`] if `root` is not a
    /// directory.
    pub fn discover(root: &Path, catalog: &ScriptCatalog) -> Result<Self, RunnerError> {
        let folders = std::fs::read_dir(root).map_err(|_| RunnerError::ScriptsDirectoryNotFound {
            path: root.to_path_buf(),
        })?;

        let mut folders: Vec<PathBuf> = folders
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        folders.sort();

        let mut scripts: BTreeMap<String, ScriptDescriptor> = BTreeMap::new();
        for folder in folders {
            for manifest in manifests(&folder) {
                let Some(descriptor) = load_unit(&folder, &manifest, catalog) else {
                    continue;
                };
                if let Some(existing) = scripts.get(&descriptor.name) {
                    tracing::warn!(
                        script = %descriptor.name,
                        kept = %existing.manifest.display(),
                        skipped = %manifest.display(),
                        "duplicate script manifest"
                    );
                    continue;
                }
                scripts.insert(descriptor.name.clone(), descriptor);
            }
        }

        tracing::debug!(
            root = %root.display(),
            scripts = scripts.len(),
            "script discovery complete"
        );
        Ok(Self {
            root: root.to_path_buf(),
            scripts,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ScriptDescriptor> {
        self.scripts.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Public `*.json` files directly inside `folder`, sorted.
fn manifests(folder: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(folder = %folder.display(), %e, "cannot read script folder");
            return Vec::new();
        }
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.extension().is_some_and(|ext| ext == "json")
                && path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .is_some_and(|stem| !stem.starts_with('_'))
        })
        .collect();
    found.sort();
    found
}

fn load_unit(folder: &Path, manifest: &Path, catalog: &ScriptCatalog) -> Option<ScriptDescriptor> {
    let name = manifest.file_stem()?.to_str()?.to_string();
    let folder_name = folder.file_name()?.to_str()?;

    let content = match std::fs::read_to_string(manifest) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(manifest = %manifest.display(), %e, "cannot read script manifest");
            return None;
        }
    };
    if let Err(e) = serde_json::from_str::<Value>(&content) {
        tracing::warn!(manifest = %manifest.display(), %e, "script manifest is not valid JSON");
        return None;
    }
    let Some(factory) = catalog.get(&name) else {
        tracing::warn!(script = %name, manifest = %manifest.display(), "no such script in catalog");
        return None;
    };

    Some(ScriptDescriptor {
        name,
        scope: format!("{SCRIPTS_SCOPE}/{folder_name}"),
        manifest: manifest.to_path_buf(),
        entries: factory(),
    })
}
