//! History event model for workflow executions.
//!
//! This module defines the core `HistoryEvent` struct, the `EventType` enum
//! covering the 8 catalog event types, and typed payload data structs. A
//! history is an append-only, event-sourced log; one linearized sequence of
//! events for an execution in one region's view is a *branch*.
//!
//! Event identifiers are monotonically increasing within one branch but are
//! **not** globally unique across branches — two regions that diverge will
//! both hand out the same `event_id` range. The `version` field records the
//! region/epoch write-version active when the event was recorded and is what
//! conflict resolution uses to order branches.

pub mod data;
pub mod types;

pub use data::{
    CancelRequestedData, CompletedData, ContinuedAsNewData, DataParseError, EventData, FailedData,
    SignaledData, StartedData, TerminatedData, TimedOutData,
};
pub use types::{EventType, UnknownEventType};

use serde::{Deserialize, Serialize};

/// A single immutable fact in a workflow execution's history.
///
/// # Serde
///
/// Custom `Deserialize` implementation uses `event_type` to drive typed
/// deserialization of the `data` field. This is necessary because the type
/// discriminant is external to the JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEvent {
    /// Identifier of this event, monotonically increasing within one branch.
    ///
    /// Not globally unique: a divergent branch reuses the same numbering.
    pub event_id: i64,

    /// Region/epoch write-version active when this event was recorded.
    pub version: i64,

    /// Wall-clock timestamp in microseconds since Unix epoch.
    pub wall_ts_us: i64,

    /// The type of fact this event represents.
    pub event_type: EventType,

    /// Typed payload data specific to the event type.
    pub data: EventData,
}

impl HistoryEvent {
    /// Build a `workflow.signaled` event.
    ///
    /// Used by `MutableState` implementations when appending a signal
    /// delivery to the current branch, and by tests building candidate
    /// histories.
    #[must_use]
    pub fn signaled(
        event_id: i64,
        version: i64,
        wall_ts_us: i64,
        signal_name: impl Into<String>,
        input: Vec<u8>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            event_id,
            version,
            wall_ts_us,
            event_type: EventType::Signaled,
            data: EventData::Signaled(SignaledData {
                signal_name: signal_name.into(),
                input,
                identity: identity.into(),
                extra: std::collections::BTreeMap::new(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for HistoryEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        /// Helper struct for two-pass deserialization: first get the
        /// `event_type`, then use it to deserialize the data payload.
        #[derive(Deserialize)]
        struct HistoryEventRaw {
            event_id: i64,
            version: i64,
            wall_ts_us: i64,
            event_type: EventType,
            data: serde_json::Value,
        }

        let raw = HistoryEventRaw::deserialize(deserializer)?;
        let data_json = raw.data.to_string();
        let data = EventData::deserialize_for(raw.event_type, &data_json)
            .map_err(serde::de::Error::custom)?;

        Ok(Self {
            event_id: raw.event_id,
            version: raw.version,
            wall_ts_us: raw.wall_ts_us,
            event_type: raw.event_type,
            data,
        })
    }
}

impl std::fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} v{} {} {}",
            self.event_id,
            self.version,
            self.event_type,
            // Abbreviated data display
            match &self.data {
                EventData::Started(d) => format!("type={}", d.workflow_type),
                EventData::Signaled(d) =>
                    format!("signal={} ({} bytes)", d.signal_name, d.input.len()),
                EventData::CancelRequested(d) => format!("by={}", d.identity),
                EventData::Completed(d) => format!("result={} bytes", d.result.len()),
                EventData::Failed(d) => format!("reason={}", d.reason),
                EventData::TimedOut(d) => format!("timeout={}", d.timeout_type),
                EventData::Terminated(d) => format!("by={}", d.identity),
                EventData::ContinuedAsNew(d) => format!("new_run={}", d.new_run_id),
            }
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
