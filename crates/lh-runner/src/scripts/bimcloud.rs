//! BIMcloud resource ingestion.
//!
//! Configuration (`scripts/BIMcloud/BIMcloud.json`):
//!
//! ```json
//! {
//!     "server": {"url": "https://bimcloud.example.com", "port": 22000, "client": "TeamClient"},
//!     "table": "bimcloud_resources",
//!     "criterion": {"$or": [{"$eq": {"type": "project"}}]}
//! }
//! ```
//!
//! `table` is a key into the general config's table catalog; without it,
//! `execute` only tracks changes. `criterion` restricts the resource types
//! and defaults to projects and libraries. Credentials arrive as the `user`
//! and `password` parameters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use lh_bimcloud::BimCloudClient;
use lh_config::ServerConfig;
use lh_core::{Criterion, ResourceRecord};
use lh_lake::{LakeStore, TableRow};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{ChangeTracker, EntryFuture, Exposed, Invocation, ScriptError, TraceableStore};

pub const NAME: &str = "BIMcloud";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
struct Settings {
    server: ServerConfig,
    #[serde(default)]
    table: Option<String>,
    #[serde(default)]
    criterion: Option<Criterion>,
}

impl Settings {
    fn types(&self) -> Criterion {
        self.criterion
            .clone()
            .unwrap_or_else(Criterion::default_types)
    }
}

/// Entry table: `execute`, `fetch`, and the `VERSION` constant.
#[must_use]
pub fn entries() -> BTreeMap<String, Exposed> {
    BTreeMap::from([
        ("execute".to_string(), Exposed::Function(execute)),
        ("fetch".to_string(), Exposed::Function(fetch)),
        ("VERSION".to_string(), Exposed::Constant(json!(VERSION))),
    ])
}

fn execute(invocation: Invocation) -> EntryFuture {
    run_execute(invocation).boxed()
}

fn fetch(invocation: Invocation) -> EntryFuture {
    run_fetch(invocation).boxed()
}

/// Fetch what changed since the last run, append it, then advance the watermark.
async fn run_execute(invocation: Invocation) -> Result<Value, ScriptError> {
    let settings = settings(&invocation)?;
    let client = connect(&invocation, &settings.server).await?;

    let mut tracker = ChangeTracker::open(TraceableStore::in_dir(&invocation.script_dir()))?;
    let criterion = tracker.criterion(settings.types());

    // Taken before the request: anything modified while the server builds
    // its answer must stay above the next watermark.
    let started = Utc::now();
    let fetched = client.fetch_resources(Some(&criterion)).await?;

    let changes = tracker.detect(&fetched, started)?;
    let rows_written = match &settings.table {
        Some(key) => append_changes(&invocation, key, &changes.changed, Utc::now())?,
        None => 0,
    };
    let changed = serde_json::to_value(&changes.changed)?;
    tracker.commit(changes)?;

    tracing::info!(
        script = %invocation.script,
        fetched = fetched.len(),
        rows_written,
        "BIMcloud sync complete"
    );
    Ok(json!({
        "fetched": fetched.len(),
        "changed": changed,
        "rows_written": rows_written,
    }))
}

/// Fetch and return resources as the server sent them. A `criterion`
/// parameter overrides the configured one.
async fn run_fetch(invocation: Invocation) -> Result<Value, ScriptError> {
    let settings = settings(&invocation)?;
    let criterion = match invocation.parameters.get("criterion") {
        Some(value) => Criterion::try_from(value.clone())?,
        None => settings.types(),
    };
    let client = connect(&invocation, &settings.server).await?;
    let resources = client.fetch_resources(Some(&criterion)).await?;
    Ok(serde_json::to_value(resources)?)
}

fn settings(invocation: &Invocation) -> Result<Settings, ScriptError> {
    let settings: Settings = invocation.config.extract()?;
    settings.server.validate()?;
    Ok(settings)
}

async fn connect(
    invocation: &Invocation,
    server: &ServerConfig,
) -> Result<BimCloudClient, ScriptError> {
    let user = invocation.string_parameter("user")?.unwrap_or_default();
    let password = invocation.string_parameter("password")?.unwrap_or_default();
    let mut client = BimCloudClient::new(server)?;
    client.connect(user, password).await?;
    Ok(client)
}

/// Append `changed` to the table registered under `key`.
///
/// Nothing to write is 0 rows. A named table without a `storage` section is
/// an error, so the caller does not mark the changes as seen.
fn append_changes(
    invocation: &Invocation,
    key: &str,
    changed: &[ResourceRecord],
    now: DateTime<Utc>,
) -> Result<usize, ScriptError> {
    if changed.is_empty() {
        return Ok(0);
    }
    let general = invocation.store.load_general()?;
    let path = general.storage_path(invocation.store.root())?;
    let table = general.table(key)?;
    let schema = invocation.store.load_schema(table)?;
    let lake = LakeStore::open_local(&path)?;

    let rows: Vec<TableRow> = changed
        .iter()
        .map(|resource| TableRow::from_resource(&schema, resource, now))
        .collect();
    Ok(lake.append(&table.name, &schema, &schema.track, &rows)?)
}
