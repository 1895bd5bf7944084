//! Typed payload data structs for each history event type.
//!
//! Each event type has a corresponding data struct that defines the JSON
//! payload schema. Unknown fields are preserved via `#[serde(flatten)]`
//! for forward compatibility across regions running different builds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::types::EventType;

// ---------------------------------------------------------------------------
// EventData — the unified payload enum
// ---------------------------------------------------------------------------

/// Typed payload for a history event. The discriminant comes from
/// [`EventType`], not from the JSON itself (it is an external tag in the
/// serialized history batch).
///
/// **Serde note:** `EventData` implements `Serialize` manually (dispatching
/// to the inner struct) but does **not** implement `Deserialize` directly.
/// Use [`EventData::deserialize_for`] with the known [`EventType`] to
/// deserialize from JSON. The [`HistoryEvent`](super::HistoryEvent) struct
/// handles this in its custom `Deserialize` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    /// Payload for `workflow.started`.
    Started(StartedData),
    /// Payload for `workflow.signaled`.
    Signaled(SignaledData),
    /// Payload for `workflow.cancel-requested`.
    CancelRequested(CancelRequestedData),
    /// Payload for `workflow.completed`.
    Completed(CompletedData),
    /// Payload for `workflow.failed`.
    Failed(FailedData),
    /// Payload for `workflow.timed-out`.
    TimedOut(TimedOutData),
    /// Payload for `workflow.terminated`.
    Terminated(TerminatedData),
    /// Payload for `workflow.continued-as-new`.
    ContinuedAsNew(ContinuedAsNewData),
}

impl EventData {
    /// Deserialize a JSON string into the correct `EventData` variant based
    /// on the event type.
    ///
    /// This is the primary deserialization entry point since the type
    /// discriminant lives in a separate field of the serialized event, not
    /// in the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns a [`DataParseError`] if the JSON is malformed or does not
    /// match the expected schema for the given event type.
    pub fn deserialize_for(event_type: EventType, json: &str) -> Result<Self, DataParseError> {
        let result = match event_type {
            EventType::Started => serde_json::from_str::<StartedData>(json).map(EventData::Started),
            EventType::Signaled => {
                serde_json::from_str::<SignaledData>(json).map(EventData::Signaled)
            }
            EventType::CancelRequested => {
                serde_json::from_str::<CancelRequestedData>(json).map(EventData::CancelRequested)
            }
            EventType::Completed => {
                serde_json::from_str::<CompletedData>(json).map(EventData::Completed)
            }
            EventType::Failed => serde_json::from_str::<FailedData>(json).map(EventData::Failed),
            EventType::TimedOut => {
                serde_json::from_str::<TimedOutData>(json).map(EventData::TimedOut)
            }
            EventType::Terminated => {
                serde_json::from_str::<TerminatedData>(json).map(EventData::Terminated)
            }
            EventType::ContinuedAsNew => {
                serde_json::from_str::<ContinuedAsNewData>(json).map(EventData::ContinuedAsNew)
            }
        };

        result.map_err(|source| DataParseError { event_type, source })
    }

    /// The event type this payload belongs to.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Started(_) => EventType::Started,
            Self::Signaled(_) => EventType::Signaled,
            Self::CancelRequested(_) => EventType::CancelRequested,
            Self::Completed(_) => EventType::Completed,
            Self::Failed(_) => EventType::Failed,
            Self::TimedOut(_) => EventType::TimedOut,
            Self::Terminated(_) => EventType::Terminated,
            Self::ContinuedAsNew(_) => EventType::ContinuedAsNew,
        }
    }

    /// Serialize the payload to a [`serde_json::Value`].
    ///
    /// # Errors
    ///
    /// Returns an error if the inner struct fails to serialize (should not
    /// happen with well-formed data).
    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Started(d) => serde_json::to_value(d),
            Self::Signaled(d) => serde_json::to_value(d),
            Self::CancelRequested(d) => serde_json::to_value(d),
            Self::Completed(d) => serde_json::to_value(d),
            Self::Failed(d) => serde_json::to_value(d),
            Self::TimedOut(d) => serde_json::to_value(d),
            Self::Terminated(d) => serde_json::to_value(d),
            Self::ContinuedAsNew(d) => serde_json::to_value(d),
        }
    }
}

impl Serialize for EventData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Started(d) => d.serialize(serializer),
            Self::Signaled(d) => d.serialize(serializer),
            Self::CancelRequested(d) => d.serialize(serializer),
            Self::Completed(d) => d.serialize(serializer),
            Self::Failed(d) => d.serialize(serializer),
            Self::TimedOut(d) => d.serialize(serializer),
            Self::Terminated(d) => d.serialize(serializer),
            Self::ContinuedAsNew(d) => d.serialize(serializer),
        }
    }
}

// ---------------------------------------------------------------------------
// DataParseError
// ---------------------------------------------------------------------------

/// Error produced when a payload does not match its event type's schema.
#[derive(Debug)]
pub struct DataParseError {
    /// The event type whose schema was expected.
    pub event_type: EventType,
    /// The underlying JSON error.
    pub source: serde_json::Error,
}

impl fmt::Display for DataParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid payload for {}: {}",
            self.event_type, self.source
        )
    }
}

impl std::error::Error for DataParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// Payload for `workflow.started`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedData {
    /// Registered workflow type name.
    pub workflow_type: String,
    /// Identity of the starter (client, scheduler, parent workflow).
    pub identity: String,
    /// Unrecognised fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Payload for `workflow.signaled` — the side effect this crate exists to
/// preserve across branch conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaledData {
    /// Name the signal was delivered under.
    pub signal_name: String,
    /// Opaque signal payload bytes.
    #[serde(default)]
    pub input: Vec<u8>,
    /// Identity of the originator that sent the signal.
    pub identity: String,
    /// Unrecognised fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Payload for `workflow.cancel-requested`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequestedData {
    /// Free-form cause supplied by the requester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Identity of the requester.
    pub identity: String,
    /// Unrecognised fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Payload for `workflow.completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedData {
    /// Opaque result bytes returned by the execution.
    #[serde(default)]
    pub result: Vec<u8>,
    /// Unrecognised fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Payload for `workflow.failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedData {
    /// Failure reason string.
    pub reason: String,
    /// Opaque failure details bytes.
    #[serde(default)]
    pub details: Vec<u8>,
    /// Unrecognised fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Payload for `workflow.timed-out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedOutData {
    /// Which timeout fired (e.g. `start-to-close`).
    pub timeout_type: String,
    /// Unrecognised fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Payload for `workflow.terminated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminatedData {
    /// Free-form termination reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Identity of the terminator.
    pub identity: String,
    /// Unrecognised fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Payload for `workflow.continued-as-new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuedAsNewData {
    /// Run identifier of the successor execution.
    pub new_run_id: String,
    /// Unrecognised fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
