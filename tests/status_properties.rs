// tests/status_properties.rs

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;

use wesqueue::engine::core::{merge_attachments, next_elapsed, reconcile_run_log, settled_status};
use wesqueue::fs::MockFileSystem;
use wesqueue::store::{RunLog, SubmissionField, SubmissionStore};
use wesqueue::types::{RunState, SubmissionStatus};

fn status_strategy() -> impl Strategy<Value = SubmissionStatus> {
    prop::sample::select(SubmissionStatus::ALL.to_vec())
}

fn remote_state_strategy() -> impl Strategy<Value = RunState> {
    prop::sample::select(vec![
        RunState::Unknown,
        RunState::Queued,
        RunState::Initializing,
        RunState::Running,
        RunState::Paused,
        RunState::Complete,
        RunState::ExecutorError,
        RunState::SystemError,
        RunState::Canceled,
        RunState::Canceling,
    ])
}

proptest! {
    // Whatever writes are attempted, the stored status only ever moves
    // along lifecycle edges and never leaves a terminal status.
    #[test]
    fn store_only_follows_lifecycle_edges(
        writes in proptest::collection::vec(status_strategy(), 1..12)
    ) {
        let mut store = SubmissionStore::new(MockFileSystem::new(), "store.json");
        let id = store.create("Q1", json!({}), None).unwrap();
        let mut current = SubmissionStatus::Received;

        for next in writes {
            let result = store.update("Q1", &id, SubmissionField::Status(next));
            let stored = store.get("Q1", &id).unwrap().status;

            if current.can_transition_to(next) {
                prop_assert!(result.is_ok());
                prop_assert_eq!(stored, next);
                current = next;
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(stored, current);
            }

            if current.is_terminal() {
                prop_assert!(SubmissionStatus::ALL
                    .iter()
                    .all(|s| *s == current || !current.can_transition_to(*s)));
            }
        }
    }

    // Elapsed time never decreases, and only active states move it.
    #[test]
    fn elapsed_time_is_monotonic(
        steps in proptest::collection::vec((remote_state_strategy(), 0i64..600), 1..20)
    ) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut now = start;
        let mut log = RunLog {
            run_id: "run-1".to_string(),
            state: RunState::Queued,
            start_time: start,
            elapsed_time: None,
            wes_id: None,
        };

        for (state, advance) in steps {
            now += Duration::seconds(advance);
            let before = log.elapsed_time;
            log = reconcile_run_log(&log, state, "local", now);

            let after = log.elapsed_time.unwrap();
            if let Some(prev) = before {
                prop_assert!(after >= prev);
            }
            if !state.is_active() {
                prop_assert_eq!(after, before.unwrap_or(0));
            }
            prop_assert_eq!(log.state, state);
            prop_assert_eq!(log.wes_id.as_deref(), Some("local"));
        }
    }

    #[test]
    fn active_elapsed_matches_wall_clock(secs in 0i64..100_000) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let log = RunLog {
            run_id: "run-1".to_string(),
            state: RunState::Running,
            start_time: start,
            elapsed_time: None,
            wes_id: None,
        };
        let elapsed = next_elapsed(&log, RunState::Running, start + Duration::seconds(secs));
        prop_assert_eq!(elapsed, Some(secs as u64));
    }

    #[test]
    fn merged_attachments_are_unique_and_keep_base_order(
        base in proptest::collection::vec("[a-d]", 0..6),
        extra in proptest::collection::vec("[a-f]", 0..6),
    ) {
        let merged = merge_attachments(&base, &extra);

        let mut seen = std::collections::HashSet::new();
        prop_assert!(merged.iter().all(|a| seen.insert(a.clone())));
        prop_assert!(base.iter().chain(extra.iter()).all(|a| merged.contains(a)));

        let mut first_seen: Vec<String> = Vec::new();
        for a in &base {
            if !first_seen.contains(a) {
                first_seen.push(a.clone());
            }
        }
        prop_assert_eq!(&merged[..first_seen.len()], &first_seen[..]);
    }
}

#[test]
fn completion_validates_only_with_a_target() {
    assert_eq!(
        settled_status(RunState::Complete, false),
        Some(SubmissionStatus::Complete)
    );
    assert_eq!(
        settled_status(RunState::Complete, true),
        Some(SubmissionStatus::Validated)
    );
    assert_eq!(
        settled_status(RunState::Canceled, true),
        Some(SubmissionStatus::Canceled)
    );
    assert_eq!(
        settled_status(RunState::ExecutorError, false),
        Some(SubmissionStatus::ExecutorError)
    );
    assert_eq!(settled_status(RunState::Running, true), None);
    assert_eq!(settled_status(RunState::SystemError, false), None);
}
