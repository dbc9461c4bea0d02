use std::path::Path;

use anyhow::Context;
use lh_config::ConfigStore;
use lh_runner::{Dispatcher, builtin_catalog};

/// Load `<root>/.env` (if present) without overriding variables already set.
pub fn load_dotenv(root: &Path) -> anyhow::Result<()> {
    let path = root.join(".env");
    if !path.is_file() {
        return Ok(());
    }
    dotenvy::from_path(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded .env");
    Ok(())
}

/// Config store plus dispatcher over the built-in scripts found under `root`.
pub fn dispatcher(root: &Path) -> anyhow::Result<Dispatcher> {
    let store = ConfigStore::new(root);
    let dispatcher = Dispatcher::discover(store, &builtin_catalog())
        .with_context(|| format!("failed to discover scripts under {}", root.display()))?;
    tracing::debug!(
        scripts = ?dispatcher.registry().names().collect::<Vec<_>>(),
        "scripts discovered"
    );
    Ok(dispatcher)
}
