// src/engine/core.rs

//! Pure reconciliation rules.
//!
//! Given a stored run log and a freshly polled remote state, these functions
//! decide the next run log and whether the submission settles. They do no
//! IO, which keeps the lifecycle testable without services or a store.

use chrono::{DateTime, Utc};

use crate::store::RunLog;
use crate::types::{RunState, SubmissionStatus};

/// Elapsed seconds to record after observing `remote`.
///
/// - active states (`QUEUED`, `INITIALIZING`, `RUNNING`) recompute from the
///   stored start time, never going below the previous value
/// - any other state keeps the previous value, or starts it at zero
pub fn next_elapsed(previous: &RunLog, remote: RunState, now: DateTime<Utc>) -> Option<u64> {
    if remote.is_active() {
        let since_start = u64::try_from((now - previous.start_time).num_seconds()).unwrap_or(0);
        Some(previous.elapsed_time.map_or(since_start, |prev| prev.max(since_start)))
    } else {
        Some(previous.elapsed_time.unwrap_or(0))
    }
}

/// Fold a polled remote state into the stored run log.
pub fn reconcile_run_log(
    previous: &RunLog,
    remote: RunState,
    wes_id: &str,
    now: DateTime<Utc>,
) -> RunLog {
    RunLog {
        run_id: previous.run_id.clone(),
        state: remote,
        start_time: previous.start_time,
        elapsed_time: next_elapsed(previous, remote, now),
        wes_id: Some(wes_id.to_string()),
    }
}

/// Local status a submission settles into, if `remote` is terminal.
///
/// A completed run on a queue with a downstream target settles as
/// `VALIDATED` (after notification) instead of `COMPLETE`.
pub fn settled_status(remote: RunState, has_target: bool) -> Option<SubmissionStatus> {
    match remote.terminal_status()? {
        SubmissionStatus::Complete if has_target => Some(SubmissionStatus::Validated),
        status => Some(status),
    }
}

/// Append `extra` to `base`, dropping duplicates but keeping first-seen order.
pub fn merge_attachments(base: &[String], extra: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(base.len() + extra.len());
    for locator in base.iter().chain(extra.iter()) {
        if !merged.contains(locator) {
            merged.push(locator.clone());
        }
    }
    merged
}
