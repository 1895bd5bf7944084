//! Reapplication identity keys and the durable dedup index.
//!
//! A reapplied side effect is identified by `(run_id, event_id, version)`,
//! where `run_id` names the **source** branch the event was originally
//! recorded on — deliberately not the target run, so the same original event
//! is never reapplied twice even when repeated conflict resolutions pick
//! different target runs. For a given execution, at most one successful
//! append occurs per distinct key for the lifetime of that execution.
//!
//! The index itself is a plain ordered set; durability is the owning
//! `MutableState` implementation's concern (the markers are persisted as
//! part of the execution's own state in the caller's transaction).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Composite identity of one reapplied event: source run, source event id,
/// source write-version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReappliedId {
    /// Run identifier of the discarded source branch.
    pub run_id: String,
    /// Event identifier within the source branch.
    pub event_id: i64,
    /// Write-version active when the source event was recorded.
    pub version: i64,
}

impl ReappliedId {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(run_id: impl Into<String>, event_id: i64, version: i64) -> Self {
        Self {
            run_id: run_id.into(),
            event_id,
            version,
        }
    }

    /// Key for a candidate event taken from the source branch `run_id`.
    #[must_use]
    pub fn for_event(run_id: &str, event: &crate::event::HistoryEvent) -> Self {
        Self::new(run_id, event.event_id, event.version)
    }
}

impl fmt::Display for ReappliedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.run_id, self.event_id, self.version)
    }
}

/// Error returned when parsing a malformed reapplied-id string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed reapplied id '{raw}': expected <run_id>:<event_id>:<version>")]
pub struct ParseReappliedIdError {
    /// The unparseable input.
    pub raw: String,
}

impl FromStr for ReappliedId {
    type Err = ParseReappliedIdError;

    /// Parse `<run_id>:<event_id>:<version>`.
    ///
    /// The two trailing integer fields are split off from the right, so run
    /// identifiers containing `:` remain parseable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseReappliedIdError { raw: s.to_string() };

        let (rest, version) = s.rsplit_once(':').ok_or_else(malformed)?;
        let (run_id, event_id) = rest.rsplit_once(':').ok_or_else(malformed)?;
        if run_id.is_empty() {
            return Err(malformed());
        }

        let event_id: i64 = event_id.parse().map_err(|_| malformed())?;
        let version: i64 = version.parse().map_err(|_| malformed())?;

        Ok(Self::new(run_id, event_id, version))
    }
}

/// Ordered set of reapplied-event keys.
///
/// The building block a `MutableState` implementation uses for its dedup
/// bookkeeping. Serde-persistable so implementations can fold it into their
/// own durable execution record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReappliedIndex {
    keys: BTreeSet<ReappliedId>,
}

impl ReappliedIndex {
    /// Create an empty index.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            keys: BTreeSet::new(),
        }
    }

    /// Returns true when the key has already been recorded.
    #[must_use]
    pub fn contains(&self, key: &ReappliedId) -> bool {
        self.keys.contains(key)
    }

    /// Record a key. Returns true when the key was not previously present.
    pub fn insert(&mut self, key: ReappliedId) -> bool {
        self.keys.insert(key)
    }

    /// Number of recorded keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true when no key has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate over recorded keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &ReappliedId> {
        self.keys.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
