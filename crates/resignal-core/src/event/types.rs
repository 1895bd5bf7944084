//! Event type enum covering the workflow history event catalog.
//!
//! Each event type corresponds to one kind of fact recorded in a workflow
//! execution's history. The string representation uses the
//! `workflow.<verb>` dotted format used in serialized history batches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The 8 event types in the resignal history catalog.
///
/// String representation follows the `workflow.<verb>` convention used in
/// serialized history batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    /// Execution started on this branch.
    Started,
    /// An external signal was delivered to the execution.
    Signaled,
    /// An external caller requested cancellation.
    CancelRequested,
    /// Execution reached the completed terminal state.
    Completed,
    /// Execution reached the failed terminal state.
    Failed,
    /// Execution exceeded its run timeout.
    TimedOut,
    /// Execution was forcibly terminated.
    Terminated,
    /// Execution was closed and continued as a new run.
    ContinuedAsNew,
}

/// Error returned when parsing an unknown event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown event type '{}': expected one of workflow.started, \
             workflow.signaled, workflow.cancel-requested, workflow.completed, \
             workflow.failed, workflow.timed-out, workflow.terminated, \
             workflow.continued-as-new",
            self.raw
        )
    }
}

impl std::error::Error for UnknownEventType {}

impl EventType {
    /// All known event types in catalog order.
    pub const ALL: [Self; 8] = [
        Self::Started,
        Self::Signaled,
        Self::CancelRequested,
        Self::Completed,
        Self::Failed,
        Self::TimedOut,
        Self::Terminated,
        Self::ContinuedAsNew,
    ];

    /// Return the canonical `workflow.<verb>` string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "workflow.started",
            Self::Signaled => "workflow.signaled",
            Self::CancelRequested => "workflow.cancel-requested",
            Self::Completed => "workflow.completed",
            Self::Failed => "workflow.failed",
            Self::TimedOut => "workflow.timed-out",
            Self::Terminated => "workflow.terminated",
            Self::ContinuedAsNew => "workflow.continued-as-new",
        }
    }

    /// Returns true for event types that carry an external side effect and
    /// are therefore eligible for reapplication onto a winning branch.
    ///
    /// Everything else in the history is reconstructable from the winning
    /// branch and must never be replayed. Adding a new reapplicable type
    /// means adding one arm here and registering a handler for it.
    #[must_use]
    pub const fn is_reapplicable(self) -> bool {
        matches!(self, Self::Signaled)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workflow.started" => Ok(Self::Started),
            "workflow.signaled" => Ok(Self::Signaled),
            "workflow.cancel-requested" => Ok(Self::CancelRequested),
            "workflow.completed" => Ok(Self::Completed),
            "workflow.failed" => Ok(Self::Failed),
            "workflow.timed-out" => Ok(Self::TimedOut),
            "workflow.terminated" => Ok(Self::Terminated),
            "workflow.continued-as-new" => Ok(Self::ContinuedAsNew),
            _ => Err(UnknownEventType { raw: s.to_string() }),
        }
    }
}

// Custom serde: serialize as the `workflow.<verb>` string.
impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
