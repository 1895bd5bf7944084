//! In-memory reference implementation of [`MutableState`].
//!
//! Backs tests and embedders that keep an execution's working state entirely
//! in memory. Appends assign fresh event ids and the state's current
//! write-version; dedup markers live in a [`ReappliedIndex`] that a caller
//! can serialize into its own durable record. The production capability —
//! with real persistence behind it — lives outside this crate.

use serde::{Deserialize, Serialize};

use crate::dedup::{ReappliedId, ReappliedIndex};
use crate::event::HistoryEvent;

use super::{ExecutionInfo, MutableState, StateError, WorkflowStatus};

/// One workflow execution's current branch, held in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryWorkflowState {
    info: ExecutionInfo,
    status: WorkflowStatus,
    write_version: i64,
    next_event_id: i64,
    next_wall_ts_us: i64,
    history: Vec<HistoryEvent>,
    reapplied: ReappliedIndex,
}

impl InMemoryWorkflowState {
    /// Create a running execution with an empty history.
    ///
    /// Event ids start at 1; timestamps are a deterministic strictly
    /// increasing sequence so histories compare stably in tests.
    #[must_use]
    pub fn new(info: ExecutionInfo, write_version: i64) -> Self {
        Self {
            info,
            status: WorkflowStatus::Running,
            write_version,
            next_event_id: 1,
            next_wall_ts_us: 1,
            history: Vec::new(),
            reapplied: ReappliedIndex::new(),
        }
    }

    /// Transition the execution to a new lifecycle status.
    pub fn set_status(&mut self, status: WorkflowStatus) {
        self.status = status;
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Advance the write-version, as a region failover would.
    pub fn set_write_version(&mut self, version: i64) {
        self.write_version = version;
    }

    /// Events appended to the current branch, in append order.
    #[must_use]
    pub fn history(&self) -> &[HistoryEvent] {
        &self.history
    }

    /// The dedup marker set, for callers that persist it.
    #[must_use]
    pub const fn reapplied_index(&self) -> &ReappliedIndex {
        &self.reapplied
    }

    fn next_ids(&mut self) -> (i64, i64) {
        let event_id = self.next_event_id;
        let wall_ts_us = self.next_wall_ts_us;
        self.next_event_id += 1;
        self.next_wall_ts_us += 1;
        (event_id, wall_ts_us)
    }
}

impl MutableState for InMemoryWorkflowState {
    fn is_workflow_execution_running(&self) -> bool {
        self.status.is_running()
    }

    fn last_write_version(&self) -> Result<i64, StateError> {
        Ok(self.write_version)
    }

    fn execution_info(&self) -> &ExecutionInfo {
        &self.info
    }

    fn is_event_reapplied(&self, key: &ReappliedId) -> bool {
        self.reapplied.contains(key)
    }

    fn update_reapplied_event(&mut self, key: ReappliedId) {
        self.reapplied.insert(key);
    }

    fn add_workflow_execution_signaled(
        &mut self,
        signal_name: &str,
        input: &[u8],
        identity: &str,
    ) -> Result<HistoryEvent, StateError> {
        if !self.status.is_running() {
            return Err(StateError::AppendRejected {
                reason: format!("execution is {}", self.status),
            });
        }

        let (event_id, wall_ts_us) = self.next_ids();
        let event = HistoryEvent::signaled(
            event_id,
            self.write_version,
            wall_ts_us,
            signal_name,
            input.to_vec(),
            identity,
        );
        self.history.push(event.clone());
        Ok(event)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    fn sample_info() -> ExecutionInfo {
        ExecutionInfo {
            domain_id: "dom-1".into(),
            workflow_id: "wf-1".into(),
            run_id: "run-current".into(),
        }
    }

    #[test]
    fn append_assigns_fresh_ids_and_current_version() {
        let mut state = InMemoryWorkflowState::new(sample_info(), 7);

        let first = state
            .add_workflow_execution_signaled("a", &[1], "cli")
            .expect("append");
        let second = state
            .add_workflow_execution_signaled("b", &[], "cli")
            .expect("append");

        assert_eq!(first.event_id, 1);
        assert_eq!(second.event_id, 2);
        assert_eq!(first.version, 7);
        assert_eq!(second.version, 7);
        assert!(first.wall_ts_us < second.wall_ts_us);
        assert_eq!(state.history().len(), 2);
        assert_eq!(state.history()[0].event_type, EventType::Signaled);
    }

    #[test]
    fn append_rejected_after_terminal_transition() {
        let mut state = InMemoryWorkflowState::new(sample_info(), 1);
        state.set_status(WorkflowStatus::Terminated);

        let err = state
            .add_workflow_execution_signaled("s", &[], "cli")
            .expect_err("terminated execution must reject appends");
        assert!(matches!(err, StateError::AppendRejected { .. }));
        assert!(state.history().is_empty());
    }

    #[test]
    fn dedup_markers_are_visible_immediately() {
        let mut state = InMemoryWorkflowState::new(sample_info(), 1);
        let key = ReappliedId::new("run-losing", 5, 2);

        assert!(!state.is_event_reapplied(&key));
        state.update_reapplied_event(key.clone());
        assert!(state.is_event_reapplied(&key));
    }

    #[test]
    fn version_bump_applies_to_later_appends() {
        let mut state = InMemoryWorkflowState::new(sample_info(), 1);
        let before = state
            .add_workflow_execution_signaled("s", &[], "cli")
            .expect("append");
        state.set_write_version(2);
        let after = state
            .add_workflow_execution_signaled("s", &[], "cli")
            .expect("append");

        assert_eq!(before.version, 1);
        assert_eq!(after.version, 2);
        assert_eq!(state.last_write_version().expect("version"), 2);
    }

    #[test]
    fn state_serde_roundtrip_preserves_markers() {
        let mut state = InMemoryWorkflowState::new(sample_info(), 3);
        state.update_reapplied_event(ReappliedId::new("run-losing", 9, 3));
        let _ = state
            .add_workflow_execution_signaled("s", &[4, 2], "cli")
            .expect("append");

        let json = serde_json::to_string(&state).expect("serialize");
        let restored: InMemoryWorkflowState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, state);
        assert!(restored.is_event_reapplied(&ReappliedId::new("run-losing", 9, 3)));
    }
}
