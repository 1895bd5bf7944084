#![forbid(unsafe_code)]
//! resignal-core: event model, dedup keys, and the exactly-once
//! reapplication engine.
//!
//! When a workflow's history is replicated across regions, two regions can
//! independently append conflicting events to the same logical execution.
//! Conflict resolution picks a winning branch; the side-effecting events
//! recorded only on the losing branch (external signals) are replayed onto
//! the winning branch by [`reapply::EventsReapplier`], exactly once per
//! [`dedup::ReappliedId`] key, no matter how many times resolution reruns.
//!
//! # Conventions
//!
//! - **Errors**: per-module `thiserror` enums; capability errors propagate
//!   unmodified through `#[error(transparent)]`.
//! - **Logging**: `tracing` macros (`warn!` on skip/error paths, `debug!`
//!   on per-event decisions).
//! - **Metrics**: the `metrics` facade; see [`telemetry`] for names.

pub mod dedup;
pub mod event;
pub mod reapply;
pub mod state;
pub mod telemetry;

pub use dedup::{ParseReappliedIdError, ReappliedId, ReappliedIndex};
pub use event::{EventData, EventType, HistoryEvent, SignaledData, UnknownEventType};
pub use reapply::{
    DuplicateHandler, EventsReapplier, ReapplyError, ReapplyHandler, SignalHandler,
};
pub use state::{ExecutionInfo, MutableState, StateError, WorkflowStatus};
pub use state::memory::InMemoryWorkflowState;
pub use telemetry::ReapplyOutcome;
