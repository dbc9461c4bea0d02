//! Discovery and dispatch against a scratch config root.

use std::collections::BTreeMap;
use std::path::Path;

use futures::FutureExt;
use lh_config::{ConfigError, ConfigStore};
use lh_runner::{
    Dispatcher, EntryFuture, Exposed, Invocation, RunnerError, ScriptCatalog, ScriptError,
    ScriptRegistry, builtin_catalog,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Map, Value, json};

// ── Helpers ─────────────────────────────────────────────────────────

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn echo(invocation: Invocation) -> EntryFuture {
    async move {
        Ok(json!({
            "script": invocation.script,
            "entry": invocation.entry,
            "parameters": invocation.parameters,
            "greeting": invocation.config.field("greeting").ok().cloned(),
        }))
    }
    .boxed()
}

fn fail(invocation: Invocation) -> EntryFuture {
    async move {
        Err(ScriptError::InvalidParameter {
            name: "anything".into(),
            reason: format!("{} always fails", invocation.script),
        })
    }
    .boxed()
}

fn echo_entries() -> BTreeMap<String, Exposed> {
    BTreeMap::from([
        ("execute".to_string(), Exposed::Function(echo)),
        ("fail".to_string(), Exposed::Function(fail)),
        ("VERSION".to_string(), Exposed::Constant(json!("1.2.3"))),
    ])
}

fn catalog() -> ScriptCatalog {
    ScriptCatalog::new()
        .with("Echo", echo_entries)
        .with("Other", echo_entries)
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn dispatcher(root: &Path) -> Dispatcher {
    Dispatcher::discover(ConfigStore::without_env(root), &catalog()).unwrap()
}

fn echo_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "scripts/Echo/Echo.json", r#"{"greeting": "hello"}"#);
    dir
}

// ── Discovery ───────────────────────────────────────────────────────

#[test]
fn missing_scripts_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = ScriptRegistry::discover(&dir.path().join("scripts"), &catalog()).unwrap_err();
    assert!(matches!(err, RunnerError::ScriptsDirectoryNotFound { .. }));
}

#[test]
fn invalid_units_are_omitted() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "scripts/Echo/Echo.json", "{}");
    write(root, "scripts/Other/Other.json", r#"{"a": 1}"#);
    // Not valid JSON.
    write(root, "scripts/Broken/Echo2.json", "{ nope");
    // Not in the catalog.
    write(root, "scripts/Unknown/Unknown.json", "{}");
    // Private and non-manifest files.
    write(root, "scripts/Echo/_traceables.json", "{}");
    write(root, "scripts/Echo/notes.txt", "hi");
    write(root, "scripts/loose.json", "{}");

    let registry = ScriptRegistry::discover(&root.join("scripts"), &catalog()).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Echo", "Other"]);
    let echo = registry.get("Echo").unwrap();
    assert_eq!(echo.scope, "scripts/Echo");
    assert_eq!(
        echo.entry_names().collect::<Vec<_>>(),
        vec!["VERSION", "execute", "fail"]
    );
}

#[test]
fn duplicate_manifests_keep_first_folder() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "scripts/A/Echo.json", "{}");
    write(dir.path(), "scripts/B/Echo.json", "{}");

    let registry = ScriptRegistry::discover(&dir.path().join("scripts"), &catalog()).unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("Echo").unwrap().scope, "scripts/A");
}

#[test]
fn builtin_catalog_lists_bimcloud() {
    assert_eq!(builtin_catalog().names().collect::<Vec<_>>(), vec!["BIMcloud"]);
}

// ── Dispatch ────────────────────────────────────────────────────────

#[tokio::test]
async fn execute_passes_parameters_and_config() {
    let dir = echo_root();
    let result = dispatcher(dir.path())
        .execute("Echo", None, params(json!({"user": "alice"})))
        .await
        .unwrap();

    assert_eq!(
        result,
        json!({
            "script": "Echo",
            "entry": "execute",
            "parameters": {"user": "alice"},
            "greeting": "hello",
        })
    );
}

#[rstest]
#[case(json!({}))]
#[case(json!({"user": "alice"}))]
#[case(json!({"config": {}}))]
#[tokio::test]
async fn unknown_script_fails_regardless_of_parameters(#[case] parameters: Value) {
    let dir = echo_root();
    let err = dispatcher(dir.path())
        .execute("Missing", None, params(parameters))
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::ScriptNotFound(ref name) if name == "Missing"));
}

#[tokio::test]
async fn unknown_entry() {
    let dir = echo_root();
    let err = dispatcher(dir.path())
        .execute("Echo", Some("nope"), Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::EntryNotFound { ref entry, .. } if entry == "nope"));
}

#[tokio::test]
async fn constants_are_not_callable() {
    let dir = echo_root();
    let err = dispatcher(dir.path())
        .execute("Echo", Some("VERSION"), Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::NotCallable { .. }));
}

#[tokio::test]
async fn config_parameter_is_reserved() {
    let dir = echo_root();
    let err = dispatcher(dir.path())
        .execute("Echo", None, params(json!({"config": {"greeting": "bye"}})))
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::ReservedParameter(ref name) if name == "config"));
}

#[tokio::test]
async fn manifest_removed_after_discovery() {
    let dir = echo_root();
    let dispatcher = dispatcher(dir.path());
    std::fs::remove_file(dir.path().join("scripts/Echo/Echo.json")).unwrap();

    let err = dispatcher.execute("Echo", None, Map::new()).await.unwrap_err();
    assert!(matches!(err, RunnerError::Config(ConfigError::NotFound { .. })));
}

#[tokio::test]
async fn entry_failures_are_wrapped() {
    let dir = echo_root();
    let err = dispatcher(dir.path())
        .execute("Echo", Some("fail"), Map::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Script { ref entry, source: ScriptError::InvalidParameter { .. }, .. } if entry == "fail"
    ));
}
