//! Persistence of per-script change-tracking state.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lh_core::{ChangeSet, Criterion, ResourceRecord, TraceableState, detect_changes};

use crate::ScriptError;

/// Tracking file name inside a script folder. The leading `_` keeps it out
/// of script discovery.
pub const TRACKING_FILE: &str = "_traceables.json";

/// JSON file holding a [`TraceableState`]. Reads and writes use the same path.
#[derive(Debug, Clone)]
pub struct TraceableStore {
    path: PathBuf,
}

impl TraceableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The tracking file of the script living in `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(TRACKING_FILE))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state, or the bootstrap default if the file does not exist.
    ///
    /// # Errors
    ///
    /// [`ScriptError::Tracking`] if the file cannot be read,
    /// [`ScriptError::TrackingFormat`] if it does not parse.
    pub fn load(&self) -> Result<TraceableState, ScriptError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no tracking file, starting fresh");
            return Ok(TraceableState::default());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|source| ScriptError::Tracking {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ScriptError::TrackingFormat {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the file with `state`, pretty-printed.
    ///
    /// The JSON is written to a temporary file in the same directory and
    /// renamed over the old one, so readers see either the old or the new
    /// state in full.
    ///
    /// # Errors
    ///
    /// [`ScriptError::Tracking`] if the file cannot be written.
    pub fn save(&self, state: &TraceableState) -> Result<(), ScriptError> {
        let io = |source| ScriptError::Tracking {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io)?;

        let json = serde_json::to_string_pretty(state).map_err(|source| {
            ScriptError::TrackingFormat {
                path: self.path.clone(),
                source,
            }
        })?;
        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(io)?;
        staged.write_all(json.as_bytes()).map_err(io)?;
        staged.as_file().sync_all().map_err(io)?;
        staged.persist(&self.path).map_err(|e| io(e.error))?;
        Ok(())
    }
}

/// Incremental change detection over a persisted [`TraceableState`].
///
/// Detection and persistence are separate steps so a caller can make the
/// changes durable elsewhere first; a failure in between leaves the stored
/// watermark untouched and the next run sees the same changes again.
#[derive(Debug)]
pub struct ChangeTracker {
    store: TraceableStore,
    state: TraceableState,
}

impl ChangeTracker {
    /// Load the tracker's state from `store`.
    ///
    /// # Errors
    ///
    /// See [`TraceableStore::load`].
    pub fn open(store: TraceableStore) -> Result<Self, ScriptError> {
        let state = store.load()?;
        Ok(Self { store, state })
    }

    #[must_use]
    pub const fn state(&self) -> &TraceableState {
        &self.state
    }

    /// Resources modified since the watermark, restricted by `types`.
    #[must_use]
    pub fn criterion(&self, types: Criterion) -> Criterion {
        Criterion::modified_since(self.state.updated_millis()).and(types)
    }

    /// Compare `fetched` against the current state without persisting anything.
    ///
    /// # Errors
    ///
    /// Propagates [`lh_core::CoreError`] from the detection pass.
    pub fn detect(
        &self,
        fetched: &[ResourceRecord],
        now: DateTime<Utc>,
    ) -> Result<ChangeSet, ScriptError> {
        Ok(detect_changes(fetched, &self.state, now)?)
    }

    /// Adopt and persist `changes`. Returns whether the file was written.
    ///
    /// A change set without changes is ignored.
    ///
    /// # Errors
    ///
    /// See [`TraceableStore::save`].
    pub fn commit(&mut self, changes: ChangeSet) -> Result<bool, ScriptError> {
        if !changes.has_changes() {
            return Ok(false);
        }
        self.store.save(&changes.state)?;
        tracing::debug!(
            path = %self.store.path().display(),
            changed = changes.changed.len(),
            tracked = changes.state.resources.len(),
            "tracking state saved"
        );
        self.state = changes.state;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use lh_core::ResourceType;
    use lh_core::traceable::parse_timestamp;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};

    use super::*;

    fn resource(id: &str, modified: &str) -> ResourceRecord {
        ResourceRecord {
            id: id.to_string(),
            name: format!("Proj-{id}"),
            modified_date: parse_timestamp(modified).unwrap().timestamp_millis(),
            kind: ResourceType::Project,
            extra: Map::new(),
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = TraceableStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), TraceableState::default());
        assert_eq!(store.path(), dir.path().join("_traceables.json"));
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = TraceableStore::in_dir(dir.path());
        std::fs::write(store.path(), "{\"updated\": 3}").unwrap();
        assert!(matches!(
            store.load(),
            Err(ScriptError::TrackingFormat { .. })
        ));
    }

    #[test]
    fn empty_fetch_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = TraceableStore::in_dir(dir.path());
        let mut tracker = ChangeTracker::open(store.clone()).unwrap();

        let changes = tracker.detect(&[], at("2025-03-01 00:00:00")).unwrap();
        assert!(!tracker.commit(changes).unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn changes_round_trip_through_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TraceableStore::in_dir(dir.path());
        let mut tracker = ChangeTracker::open(store.clone()).unwrap();

        let fetched = vec![resource("a", "2025-02-01 00:00:00")];
        let changes = tracker.detect(&fetched, at("2025-03-01 00:00:00")).unwrap();
        assert_eq!(changes.changed.len(), 1);
        assert!(tracker.commit(changes).unwrap());

        let reopened = ChangeTracker::open(store).unwrap();
        assert_eq!(reopened.state(), tracker.state());
        assert_eq!(reopened.state().updated, at("2025-03-01 00:00:00"));
        assert_eq!(
            reopened.state().resources["a"].friendly_date,
            "2025-02-01 00:00:00"
        );

        let again = reopened
            .detect(&fetched, at("2025-03-02 00:00:00"))
            .unwrap();
        assert!(!again.has_changes());
    }

    #[test]
    fn save_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = TraceableStore::in_dir(dir.path());
        std::fs::write(store.path(), "{ truncated").unwrap();

        let mut state = TraceableState::default();
        store.save(&state).unwrap();
        state.updated = at("2025-06-01 00:00:00");
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), state);
        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from(TRACKING_FILE)]);
    }

    #[test]
    fn detect_does_not_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = TraceableStore::in_dir(dir.path());
        let tracker = ChangeTracker::open(store.clone()).unwrap();

        let changes = tracker
            .detect(&[resource("a", "2025-02-01 00:00:00")], at("2025-03-01 00:00:00"))
            .unwrap();
        assert!(changes.has_changes());
        assert!(!store.path().exists());
        assert_eq!(tracker.state(), &TraceableState::default());
    }

    #[test]
    fn criterion_uses_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ChangeTracker::open(TraceableStore::in_dir(dir.path())).unwrap();
        let criterion = tracker.criterion(Criterion::default_types());
        assert_eq!(
            serde_json::to_value(&criterion).unwrap(),
            json!({"$and": [
                {"$gte": {"$modifiedDate": 1_735_689_600_000_i64}},
                {"$or": [{"$eq": {"type": "project"}}, {"$eq": {"type": "library"}}]}
            ]})
        );
    }
}
