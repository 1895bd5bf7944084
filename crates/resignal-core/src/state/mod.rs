//! The mutable-state capability the reapplication engine consumes.
//!
//! `MutableState` is the live, in-memory representation of one workflow
//! execution's current (winning) branch. The engine treats it strictly as an
//! injected capability: it is created and loaded by the surrounding engine
//! before reapplication begins, mutated in place by successful appends, and
//! persisted by the caller afterwards — in the same transaction that commits
//! the rest of the resolved branch.
//!
//! Single-writer: one conflict-resolution operation owns the state at a
//! time. Implementations do their own locking, if any; this crate does none.

pub mod memory;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dedup::ReappliedId;
use crate::event::HistoryEvent;

/// Identity of the current execution, used for observability tagging only —
/// never for control decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    /// Domain (namespace) the execution belongs to.
    pub domain_id: String,
    /// Logical workflow identifier, stable across runs.
    pub workflow_id: String,
    /// Run identifier of the current branch.
    pub run_id: String,
}

/// Lifecycle status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStatus {
    /// Execution is live and can receive new events.
    Running,
    /// Closed: completed normally.
    Completed,
    /// Closed: failed.
    Failed,
    /// Closed: run timeout fired.
    TimedOut,
    /// Closed: forcibly terminated.
    Terminated,
    /// Closed: continued as a new run.
    ContinuedAsNew,
}

impl WorkflowStatus {
    /// Returns true while the execution has not reached a terminal status.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed-out",
            Self::Terminated => "terminated",
            Self::ContinuedAsNew => "continued-as-new",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by a `MutableState` implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The execution state disallows the requested mutation (e.g. a
    /// concurrent terminal-state transition).
    #[error("append rejected: {reason}")]
    AppendRejected {
        /// Implementation-supplied rejection reason.
        reason: String,
    },

    /// Capability-side failure, including cancellation or I/O errors
    /// surfaced by an implementation that performs its own persistence.
    #[error("mutable state failure: {0}")]
    Internal(String),
}

/// The live, single-writer owner of one execution's current branch and of
/// its dedup marker set.
///
/// The exact semantics the reapplication engine relies on:
///
/// - [`is_event_reapplied`](Self::is_event_reapplied) must reflect all
///   previously **committed** [`update_reapplied_event`](Self::update_reapplied_event)
///   calls for this execution, including ones from before a process restart.
/// - [`update_reapplied_event`](Self::update_reapplied_event) must be
///   visible to subsequent `is_event_reapplied` calls within the same
///   process immediately, and across restarts once the caller's outer
///   transaction commits.
/// - [`add_workflow_execution_signaled`](Self::add_workflow_execution_signaled)
///   appends a **new** event to the current branch — with a freshly assigned
///   event id and the current write-version, not a copy of the source
///   event's numbering — and returns it.
pub trait MutableState {
    /// True iff the execution has not reached a terminal status.
    fn is_workflow_execution_running(&self) -> bool;

    /// Current write-epoch of the branch. Observability only.
    ///
    /// # Errors
    ///
    /// Returns a [`StateError`] when the implementation cannot determine the
    /// version (e.g. unversioned legacy state).
    fn last_write_version(&self) -> Result<i64, StateError>;

    /// Identity of the current execution. Observability only.
    fn execution_info(&self) -> &ExecutionInfo;

    /// Pure lookup against the durable dedup bookkeeping.
    fn is_event_reapplied(&self, key: &ReappliedId) -> bool;

    /// Record the key as applied.
    fn update_reapplied_event(&mut self, key: ReappliedId);

    /// Append a new signal-delivery event to the current branch and return
    /// it.
    ///
    /// # Errors
    ///
    /// Returns a [`StateError`] if the execution state disallows the
    /// mutation.
    fn add_workflow_execution_signaled(
        &mut self,
        signal_name: &str,
        input: &[u8],
        identity: &str,
    ) -> Result<HistoryEvent, StateError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
