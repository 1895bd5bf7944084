//! Outcome counters and pass timers for the reapplication engine.
//!
//! Emits through the `metrics` facade: one counter per pass outcome, tagged
//! with the execution identity and the branch's last write version, plus a
//! pass-duration histogram. Exporter wiring (Prometheus or otherwise) is the
//! embedding service's concern.

use std::time::Instant;

use metrics::{counter, histogram};

use crate::state::ExecutionInfo;

/// Counter name for per-event reapplication outcomes.
pub const OUTCOMES_COUNTER: &str = "resignal_reapply_outcomes_total";

/// Histogram name for whole-pass durations, in seconds.
pub const PASS_DURATION_HISTOGRAM: &str = "resignal_reapply_pass_duration_seconds";

/// Outcome category for one candidate event in a reapplication pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReapplyOutcome {
    /// The side effect was re-emitted onto the current branch.
    Applied,
    /// The dedup index already held the event's key.
    DuplicateSkipped,
    /// The execution had reached a terminal status.
    NotRunningSkipped,
    /// The append operation failed and the pass was aborted.
    Error,
}

impl ReapplyOutcome {
    /// Stable label value for the outcome counter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::DuplicateSkipped => "duplicate_skipped",
            Self::NotRunningSkipped => "not_running_skipped",
            Self::Error => "error",
        }
    }
}

/// Increment the outcome counter for one candidate event.
pub fn record_outcome(outcome: ReapplyOutcome, info: &ExecutionInfo, last_write_version: i64) {
    counter!(
        OUTCOMES_COUNTER,
        "outcome" => outcome.as_str(),
        "domain_id" => info.domain_id.clone(),
        "workflow_id" => info.workflow_id.clone(),
        "run_id" => info.run_id.clone(),
        "version" => last_write_version.to_string(),
    )
    .increment(1);
}

/// Execute a reapplication pass while recording its duration.
pub fn time_pass<R>(info: &ExecutionInfo, f: impl FnOnce() -> R) -> R {
    let started = Instant::now();
    let result = f();
    histogram!(
        PASS_DURATION_HISTOGRAM,
        "domain_id" => info.domain_id.clone(),
        "workflow_id" => info.workflow_id.clone(),
        "run_id" => info.run_id.clone(),
    )
    .record(started.elapsed().as_secs_f64());
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels_are_stable_and_unique() {
        let all = [
            ReapplyOutcome::Applied,
            ReapplyOutcome::DuplicateSkipped,
            ReapplyOutcome::NotRunningSkipped,
            ReapplyOutcome::Error,
        ];
        let labels: std::collections::HashSet<&str> =
            all.iter().map(|o| o.as_str()).collect();
        assert_eq!(labels.len(), all.len());
        assert!(labels.contains("applied"));
    }

    #[test]
    fn time_pass_returns_closure_result() {
        let info = ExecutionInfo {
            domain_id: "d".into(),
            workflow_id: "w".into(),
            run_id: "r".into(),
        };
        // No recorder installed: emissions are no-ops, the value flows through.
        let value = time_pass(&info, || 41 + 1);
        assert_eq!(value, 42);
    }
}
