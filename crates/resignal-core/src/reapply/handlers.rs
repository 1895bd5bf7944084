//! Per-type reapplication handlers.

use crate::event::{EventData, EventType, HistoryEvent};
use crate::state::MutableState;

use super::{ReapplyError, ReapplyHandler};

/// Reapplies `workflow.signaled` events.
///
/// A signal delivered to a losing branch came from outside the system and
/// cannot be reconstructed from the winning branch, so it is re-emitted via
/// the capability's append-signal operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalHandler;

impl ReapplyHandler for SignalHandler {
    fn event_type(&self) -> EventType {
        EventType::Signaled
    }

    fn reapply(
        &self,
        state: &mut dyn MutableState,
        event: &HistoryEvent,
    ) -> Result<HistoryEvent, ReapplyError> {
        let EventData::Signaled(data) = &event.data else {
            return Err(ReapplyError::PayloadMismatch {
                event_id: event.event_id,
                event_type: event.event_type,
            });
        };

        let new_event = state.add_workflow_execution_signaled(
            &data.signal_name,
            &data.input,
            &data.identity,
        )?;
        Ok(new_event)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::memory::InMemoryWorkflowState;
    use crate::state::{ExecutionInfo, StateError, WorkflowStatus};

    fn running_state() -> InMemoryWorkflowState {
        InMemoryWorkflowState::new(
            ExecutionInfo {
                domain_id: "dom-1".into(),
                workflow_id: "wf-1".into(),
                run_id: "run-current".into(),
            },
            4,
        )
    }

    #[test]
    fn signal_payload_is_carried_verbatim() {
        let mut state = running_state();
        let source = HistoryEvent::signaled(9, 2, 9_000, "release", vec![0xCA, 0xFE], "cli");

        let new_event = SignalHandler
            .reapply(&mut state, &source)
            .expect("append should succeed");

        let EventData::Signaled(data) = &new_event.data else {
            panic!("expected signaled payload");
        };
        assert_eq!(data.signal_name, "release");
        assert_eq!(data.input, vec![0xCA, 0xFE]);
        assert_eq!(data.identity, "cli");
        // New fact, new numbering: current branch's id and version.
        assert_eq!(new_event.event_id, 1);
        assert_eq!(new_event.version, 4);
    }

    #[test]
    fn append_rejection_propagates_unmodified() {
        let mut state = running_state();
        state.set_status(WorkflowStatus::Failed);
        let source = HistoryEvent::signaled(9, 2, 9_000, "release", vec![], "cli");

        let err = SignalHandler
            .reapply(&mut state, &source)
            .expect_err("closed execution rejects appends");
        assert!(matches!(
            err,
            ReapplyError::State(StateError::AppendRejected { .. })
        ));
    }
}
