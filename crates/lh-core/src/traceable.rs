//! Traceable state: the local cache of last-seen remote resources.
//!
//! A [`TraceableState`] carries a high-watermark (`updated`) and the last
//! recorded modification date of every resource seen so far. The pure
//! [`detect_changes`] pass decides which freshly fetched resources are new
//! or updated and produces the next state. Persistence lives in `lh-runner`.
//!
//! All timestamps are interpreted as UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::resource::ResourceRecord;

/// Format of `updated` and `@friendlyDate`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format epoch milliseconds as `YYYY-MM-DD HH:MM:SS` (UTC).
///
/// # Errors
///
/// Returns [`CoreError::InvalidTimestamp`] if `millis` is out of chrono's range.
pub fn format_epoch_millis(millis: i64) -> Result<String, CoreError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .ok_or_else(|| CoreError::InvalidTimestamp {
            value: millis.to_string(),
            reason: "out of range".into(),
        })
}

/// Parse a `YYYY-MM-DD HH:MM:SS` string (UTC).
///
/// # Errors
///
/// Returns [`CoreError::InvalidTimestamp`] if the string does not match.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, CoreError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| CoreError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

mod watermark_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Last-seen metadata for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedResource {
    pub name: String,
    #[serde(rename = "$modifiedDate")]
    pub modified_date: i64,
    #[serde(rename = "@friendlyDate")]
    pub friendly_date: String,
}

/// Persisted synchronisation state of one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceableState {
    /// High-watermark of the last run that found changes. Never decreases.
    #[serde(with = "watermark_format")]
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub resources: BTreeMap<String, TrackedResource>,
}

impl Default for TraceableState {
    /// Bootstrap state for a script that has never run: watermark at
    /// 2025-01-01 00:00:00, nothing tracked.
    fn default() -> Self {
        let epoch = NaiveDate::from_ymd_opt(2025, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(DateTime::<Utc>::UNIX_EPOCH, |naive| naive.and_utc());
        Self {
            updated: epoch,
            resources: BTreeMap::new(),
        }
    }
}

impl TraceableState {
    /// The watermark in epoch milliseconds, as the remote API expects it.
    #[must_use]
    pub fn updated_millis(&self) -> i64 {
        self.updated.timestamp_millis()
    }

    fn is_changed(&self, resource: &ResourceRecord) -> bool {
        match self.resources.get(&resource.id) {
            None => true,
            Some(seen) => {
                resource.modified_date > self.updated_millis()
                    || resource.modified_date > seen.modified_date
            }
        }
    }
}

/// Outcome of one detection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    /// Next state. Equal to the prior state when nothing changed.
    pub state: TraceableState,
    /// New or updated resources, in fetch order.
    pub changed: Vec<ResourceRecord>,
}

impl ChangeSet {
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Determine which of `fetched` are new or updated relative to `prior`.
///
/// A resource is changed when its id is not tracked in `prior`, or its
/// `$modifiedDate` is later than the prior watermark, or later than the
/// recorded date for that id. Changed resources overwrite their entries;
/// if any changed, the watermark advances to the latest of `prior.updated`,
/// `now`, and the newest changed `$modifiedDate`.
///
/// The watermark is persisted at whole-second precision, so `now` is
/// truncated and modification dates are rounded up to the next second.
/// Otherwise a resource dated within the persisted second (or after `now`,
/// when the server clock runs ahead) would be reported again on every pass.
///
/// # Errors
///
/// Returns [`CoreError::InvalidTimestamp`] if a changed resource carries an
/// unrepresentable `$modifiedDate`.
pub fn detect_changes(
    fetched: &[ResourceRecord],
    prior: &TraceableState,
    now: DateTime<Utc>,
) -> Result<ChangeSet, CoreError> {
    let mut state = prior.clone();
    let mut changed = Vec::new();

    for resource in fetched {
        if !state.is_changed(resource) {
            continue;
        }
        let friendly_date = format_epoch_millis(resource.modified_date)?;
        state.resources.insert(
            resource.id.clone(),
            TrackedResource {
                name: resource.name.clone(),
                modified_date: resource.modified_date,
                friendly_date,
            },
        );
        changed.push(resource.clone());
    }

    if let Some(newest) = changed.iter().map(|r| r.modified_date).max() {
        state.updated = state
            .updated
            .max(now.trunc_subsecs(0))
            .max(ceil_to_second(newest)?);
    }

    Ok(ChangeSet { state, changed })
}

/// The first whole second at or after `millis`.
fn ceil_to_second(millis: i64) -> Result<DateTime<Utc>, CoreError> {
    let seconds = millis.div_euclid(1000) + i64::from(millis.rem_euclid(1000) != 0);
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| CoreError::InvalidTimestamp {
            value: millis.to_string(),
            reason: "out of range".into(),
        })
}
