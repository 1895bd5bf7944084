//! Exactly-once reapplication of side-effecting events onto a winning branch.
//!
//! When conflict resolution discards a losing branch, the pure side effects
//! recorded on it (signals delivered from outside) must not be lost: they
//! are replayed onto the current branch as **new** events. The engine here
//! takes the losing branch's candidate events in ascending `event_id` order,
//! filters them to the reapplicable types, skips anything already recorded
//! in the dedup index, and dispatches the rest to per-type handlers.
//!
//! # Idempotency
//!
//! Conflict resolution reruns: retries, duplicate replication, re-derivation
//! of history. Every successful append is immediately recorded under its
//! [`ReappliedId`] key `(source run, event id, version)`, so any later pass
//! over the same candidates is a no-op. Markers are committed independently
//! of the overall pass outcome — a pass that fails halfway keeps the markers
//! for its earlier successes, which is exactly what makes the caller's
//! retry-from-scratch safe.
//!
//! # Failure shape
//!
//! Callers observe either a (possibly empty) list of newly appended events
//! with no error, or no events with an error. There is no partial-success
//! return: on the first append failure the pass aborts and discards its
//! in-memory result, because the caller is expected to throw away the whole
//! attempted mutation and retry.

pub mod handlers;

pub use handlers::SignalHandler;

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::dedup::ReappliedId;
use crate::event::{EventType, HistoryEvent};
use crate::state::{MutableState, StateError};
use crate::telemetry::{self, ReapplyOutcome};

/// Errors from a reapplication pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReapplyError {
    /// The mutable-state capability rejected or failed an append. Surfaced
    /// unmodified; retrying the pass is the outer pipeline's call.
    #[error(transparent)]
    State(#[from] StateError),

    /// A candidate event's payload does not match its declared type.
    #[error("event #{event_id} payload does not match {event_type}")]
    PayloadMismatch {
        /// Source-branch event id of the offending candidate.
        event_id: i64,
        /// The declared event type.
        event_type: EventType,
    },
}

/// Error returned when registering a handler for an already-covered type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a reapply handler for {event_type} is already registered")]
pub struct DuplicateHandler {
    /// The event type with two competing handlers.
    pub event_type: EventType,
}

/// Reapplies one event type onto the current branch.
///
/// One handler per reapplicable type; adding a new reapplicable event type
/// means implementing this trait and registering it — control flow in the
/// engine does not change.
pub trait ReapplyHandler: Send + Sync {
    /// The event type this handler covers.
    fn event_type(&self) -> EventType;

    /// Re-emit the candidate's side effect as a new event on the current
    /// branch and return that new event.
    ///
    /// # Errors
    ///
    /// Returns [`ReapplyError::State`] when the capability rejects the
    /// append, or [`ReapplyError::PayloadMismatch`] for a malformed
    /// candidate.
    fn reapply(
        &self,
        state: &mut dyn MutableState,
        event: &HistoryEvent,
    ) -> Result<HistoryEvent, ReapplyError>;
}

/// Stateless reapplication engine: a registry of per-type handlers and the
/// pass algorithm. Holds nothing across calls; safe to share across
/// executions (each call owns its `MutableState` exclusively).
pub struct EventsReapplier {
    handlers: BTreeMap<EventType, Box<dyn ReapplyHandler>>,
}

impl Default for EventsReapplier {
    fn default() -> Self {
        Self::new()
    }
}

impl EventsReapplier {
    /// Engine with the default handler set (currently: signals).
    #[must_use]
    pub fn new() -> Self {
        // The default set mirrors EventType::is_reapplicable.
        let mut handlers: BTreeMap<EventType, Box<dyn ReapplyHandler>> = BTreeMap::new();
        handlers.insert(EventType::Signaled, Box::new(SignalHandler));
        Self { handlers }
    }

    /// Engine with no handlers registered. Every candidate is filtered out.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register a handler for its event type.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateHandler`] when the type is already covered.
    pub fn register(&mut self, handler: Box<dyn ReapplyHandler>) -> Result<(), DuplicateHandler> {
        let event_type = handler.event_type();
        if self.handlers.contains_key(&event_type) {
            return Err(DuplicateHandler { event_type });
        }
        self.handlers.insert(event_type, handler);
        Ok(())
    }

    /// Returns true when a handler is registered for the type.
    #[must_use]
    pub fn handles(&self, event_type: EventType) -> bool {
        self.handlers.contains_key(&event_type)
    }

    /// Replay the losing branch's side-effecting events onto the current
    /// branch, exactly once per [`ReappliedId`] key across the lifetime of
    /// the execution.
    ///
    /// `candidate_events` is the ordered (ascending source `event_id`)
    /// sequence from the branch being discarded; `source_run_id` identifies
    /// that branch and namespaces the dedup keys.
    ///
    /// Per candidate, in order: not handled ⇒ silent skip; key already in
    /// the dedup index ⇒ skip; execution not running ⇒ skip this and all
    /// remaining candidates (liveness is checked lazily, at most once per
    /// pass, and never re-checked after an append); otherwise dispatch,
    /// record the marker, and collect the newly appended event.
    ///
    /// Returns the events actually appended in this call, in order. The
    /// caller folds them — and the updated dedup markers — into the same
    /// transaction that persists the rest of the resolved branch.
    ///
    /// # Errors
    ///
    /// On the first append failure the whole pass aborts: the error is
    /// returned unmodified and no events are returned, even if earlier
    /// candidates in this call succeeded. Their dedup markers stay recorded,
    /// so a retried pass will not re-apply them.
    pub fn reapply_events(
        &self,
        state: &mut dyn MutableState,
        candidate_events: &[HistoryEvent],
        source_run_id: &str,
    ) -> Result<Vec<HistoryEvent>, ReapplyError> {
        let info = state.execution_info().clone();
        telemetry::time_pass(&info, || {
            let mut reapplied: Vec<HistoryEvent> = Vec::new();
            // Liveness snapshot for the whole pass, taken on first demand.
            let mut running: Option<bool> = None;

            for event in candidate_events {
                let Some(handler) = self.handlers.get(&event.event_type) else {
                    // Not a side-effecting type: reconstructable from the
                    // winning branch, never replayed.
                    continue;
                };

                let key = ReappliedId::for_event(source_run_id, event);
                // Observability only; a version the capability cannot
                // determine must not fail the pass.
                let version = state.last_write_version().unwrap_or(-1);

                if state.is_event_reapplied(&key) {
                    debug!(%key, event = %event, "skipping already-reapplied event");
                    telemetry::record_outcome(ReapplyOutcome::DuplicateSkipped, &info, version);
                    continue;
                }

                let is_running =
                    *running.get_or_insert_with(|| state.is_workflow_execution_running());
                if !is_running {
                    warn!(
                        run_id = %info.run_id,
                        source_run_id,
                        "execution not running; dropping remaining reapplication candidates"
                    );
                    telemetry::record_outcome(ReapplyOutcome::NotRunningSkipped, &info, version);
                    break;
                }

                match handler.reapply(state, event) {
                    Ok(new_event) => {
                        state.update_reapplied_event(key);
                        telemetry::record_outcome(ReapplyOutcome::Applied, &info, version);
                        reapplied.push(new_event);
                    }
                    Err(err) => {
                        warn!(%key, event = %event, error = %err, "event reapplication failed");
                        telemetry::record_outcome(ReapplyOutcome::Error, &info, version);
                        return Err(err);
                    }
                }
            }

            Ok(reapplied)
        })
    }
}

impl std::fmt::Debug for EventsReapplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventsReapplier")
            .field("handled_types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ExecutionInfo, WorkflowStatus};
    use crate::state::memory::InMemoryWorkflowState;

    fn sample_info() -> ExecutionInfo {
        ExecutionInfo {
            domain_id: "dom-1".into(),
            workflow_id: "wf-1".into(),
            run_id: "run-current".into(),
        }
    }

    fn signal_candidate(event_id: i64, version: i64, name: &str) -> HistoryEvent {
        HistoryEvent::signaled(event_id, version, event_id * 1_000, name, vec![0x01], "test")
    }

    fn started_candidate(event_id: i64) -> HistoryEvent {
        use crate::event::{EventData, StartedData};
        HistoryEvent {
            event_id,
            version: 1,
            wall_ts_us: event_id * 1_000,
            event_type: EventType::Started,
            data: EventData::Started(StartedData {
                workflow_type: "wf".into(),
                identity: "scheduler".into(),
                extra: std::collections::BTreeMap::new(),
            }),
        }
    }

    #[test]
    fn applies_fresh_signal_and_records_marker() {
        let reapplier = EventsReapplier::new();
        let mut state = InMemoryWorkflowState::new(sample_info(), 1);
        let candidates = vec![started_candidate(1), signal_candidate(2, 1, "release")];

        let applied = reapplier
            .reapply_events(&mut state, &candidates, "run-losing")
            .expect("pass should succeed");

        assert_eq!(applied.len(), 1);
        // The reapplied event is a new fact with the current branch's
        // numbering, not a copy of the source event's.
        assert_eq!(applied[0].event_id, 1);
        assert_eq!(state.history(), applied.as_slice());
        assert!(state.is_event_reapplied(&ReappliedId::new("run-losing", 2, 1)));
    }

    #[test]
    fn skips_already_reapplied_event() {
        let reapplier = EventsReapplier::new();
        let mut state = InMemoryWorkflowState::new(sample_info(), 1);
        state.update_reapplied_event(ReappliedId::new("run-losing", 2, 1));

        let candidates = vec![started_candidate(1), signal_candidate(2, 1, "release")];
        let applied = reapplier
            .reapply_events(&mut state, &candidates, "run-losing")
            .expect("pass should succeed");

        assert!(applied.is_empty());
        assert!(state.history().is_empty(), "append must never be invoked");
    }

    #[test]
    fn mixed_fresh_and_duplicate_applies_only_fresh() {
        let reapplier = EventsReapplier::new();
        let mut state = InMemoryWorkflowState::new(sample_info(), 1);
        state.update_reapplied_event(ReappliedId::new("run-losing", 3, 1));

        let candidates = vec![
            started_candidate(1),
            signal_candidate(2, 1, "fresh"),
            signal_candidate(3, 1, "duplicate"),
        ];
        let applied = reapplier
            .reapply_events(&mut state, &candidates, "run-losing")
            .expect("pass should succeed");

        assert_eq!(applied.len(), 1);
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn not_running_skips_all_candidates_without_error() {
        let reapplier = EventsReapplier::new();
        let mut state = InMemoryWorkflowState::new(sample_info(), 1);
        state.set_status(WorkflowStatus::Completed);

        let candidates = vec![
            signal_candidate(2, 1, "one"),
            signal_candidate(3, 1, "two"),
        ];
        let applied = reapplier
            .reapply_events(&mut state, &candidates, "run-losing")
            .expect("terminated execution is not an error");

        assert!(applied.is_empty());
        assert!(state.history().is_empty());
        assert!(
            !state.is_event_reapplied(&ReappliedId::new("run-losing", 2, 1)),
            "no marker is recorded for events that were never applied"
        );
    }

    #[test]
    fn same_key_never_applied_twice_across_passes() {
        let reapplier = EventsReapplier::new();
        let mut state = InMemoryWorkflowState::new(sample_info(), 1);
        let candidates = vec![signal_candidate(2, 1, "release")];

        let first = reapplier
            .reapply_events(&mut state, &candidates, "run-losing")
            .expect("first pass");
        let second = reapplier
            .reapply_events(&mut state, &candidates, "run-losing")
            .expect("second pass");

        assert_eq!(first.len(), 1);
        assert!(second.is_empty(), "rerun must be a no-op");
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn count_matches_fresh_eligible_candidates() {
        let reapplier = EventsReapplier::new();
        let mut state = InMemoryWorkflowState::new(sample_info(), 1);

        let candidates: Vec<HistoryEvent> = (1..=5)
            .map(|i| signal_candidate(i, 1, &format!("signal-{i}")))
            .collect();
        let applied = reapplier
            .reapply_events(&mut state, &candidates, "run-losing")
            .expect("pass should succeed");

        assert_eq!(applied.len(), 5);
        assert_eq!(state.reapplied_index().len(), 5);
    }

    #[test]
    fn empty_engine_filters_everything() {
        let reapplier = EventsReapplier::empty();
        let mut state = InMemoryWorkflowState::new(sample_info(), 1);
        let candidates = vec![signal_candidate(2, 1, "release")];

        let applied = reapplier
            .reapply_events(&mut state, &candidates, "run-losing")
            .expect("pass should succeed");
        assert!(applied.is_empty());
        assert!(state.reapplied_index().is_empty(), "no dedup check recorded");
    }

    #[test]
    fn register_rejects_duplicate_type() {
        let mut reapplier = EventsReapplier::new();
        let err = reapplier
            .register(Box::new(SignalHandler))
            .expect_err("second signal handler must be rejected");
        assert_eq!(err.event_type, EventType::Signaled);
        assert!(reapplier.handles(EventType::Signaled));
    }

    #[test]
    fn payload_mismatch_is_an_error() {
        use crate::event::{EventData, StartedData};

        let reapplier = EventsReapplier::new();
        let mut state = InMemoryWorkflowState::new(sample_info(), 1);
        // Declared signaled, started-shaped payload.
        let bogus = HistoryEvent {
            event_id: 2,
            version: 1,
            wall_ts_us: 2_000,
            event_type: EventType::Signaled,
            data: EventData::Started(StartedData {
                workflow_type: "wf".into(),
                identity: "scheduler".into(),
                extra: std::collections::BTreeMap::new(),
            }),
        };

        let err = reapplier
            .reapply_events(&mut state, &[bogus], "run-losing")
            .expect_err("mismatched payload must fail the pass");
        assert!(matches!(err, ReapplyError::PayloadMismatch { event_id: 2, .. }));
        assert!(state.history().is_empty());
    }
}
