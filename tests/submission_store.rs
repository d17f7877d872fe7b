// tests/submission_store.rs

mod common;
use crate::common::{epoch, init_tracing, STORE_PATH};

use std::collections::HashSet;

use serde_json::json;

use wesqueue::errors::WesQueueError;
use wesqueue::fs::MockFileSystem;
use wesqueue::store::{RunLog, StatusFilter, SubmissionField, SubmissionStore};
use wesqueue::types::{RunState, SubmissionStatus};

fn store() -> (MockFileSystem, SubmissionStore<MockFileSystem>) {
    init_tracing();
    let fs = MockFileSystem::new();
    let store = SubmissionStore::new(fs.clone(), STORE_PATH);
    (fs, store)
}

fn run_log(run_id: &str) -> RunLog {
    RunLog {
        run_id: run_id.to_string(),
        state: RunState::Running,
        start_time: epoch(),
        elapsed_time: Some(12),
        wes_id: Some("local".to_string()),
    }
}

#[test]
fn create_then_list_returns_received_submission() {
    let (_fs, mut store) = store();

    let id = store
        .create("Q1", json!({ "input": "a.txt" }), None)
        .unwrap();

    let listed = store.list("Q1", &StatusFilter::default()).unwrap();
    assert_eq!(listed, vec![id.clone()]);

    let submission = store.get("Q1", &id).unwrap();
    assert_eq!(submission.status, SubmissionStatus::Received);
    assert_eq!(submission.data, json!({ "input": "a.txt" }));
    assert_eq!(submission.wes_id, None);
    assert!(submission.run_log.is_none());
}

#[test]
fn unknown_queue_lists_empty() {
    let (_fs, mut store) = store();
    store.create("Q1", json!({}), None).unwrap();

    let listed = store.list("unknown_queue", &StatusFilter::all()).unwrap();
    assert!(listed.is_empty());
}

#[test]
fn missing_document_is_an_empty_store() {
    let (_fs, store) = store();
    assert!(store.list("Q1", &StatusFilter::all()).unwrap().is_empty());
    assert!(store.queue_ids().unwrap().is_empty());
}

#[test]
fn get_missing_submission_is_not_found() {
    let (_fs, mut store) = store();
    store.create("Q1", json!({}), None).unwrap();

    match store.get("Q1", "19700101000000000000") {
        Err(WesQueueError::NotFound(msg)) => assert!(msg.contains("Q1")),
        other => panic!("Expected NotFound, got: {:?}", other),
    }
}

#[test]
fn rapid_creation_never_collides() {
    let (_fs, mut store) = store();

    let ids: Vec<_> = (0..50)
        .map(|n| store.create("Q1", json!({ "n": n }), None).unwrap())
        .collect();
    let unique: HashSet<_> = ids.iter().collect();

    assert_eq!(unique.len(), ids.len());
    assert_eq!(store.list("Q1", &StatusFilter::all()).unwrap(), ids);
}

#[test]
fn listing_keeps_creation_order_and_filters_status() {
    let (_fs, mut store) = store();
    let a = store.create("Q1", json!({}), None).unwrap();
    let b = store.create("Q1", json!({}), None).unwrap();
    let c = store.create("Q1", json!({}), None).unwrap();

    store
        .update("Q1", &b, SubmissionField::Status(SubmissionStatus::Submitted))
        .unwrap();
    store
        .update("Q1", &c, SubmissionField::Status(SubmissionStatus::Submitted))
        .unwrap();
    store
        .update("Q1", &c, SubmissionField::Status(SubmissionStatus::Canceled))
        .unwrap();

    assert_eq!(
        store
            .list("Q1", &StatusFilter::only(SubmissionStatus::Received))
            .unwrap(),
        vec![a.clone()]
    );
    // CANCELED is not in the default set.
    assert_eq!(
        store.list("Q1", &StatusFilter::default()).unwrap(),
        vec![a.clone(), b.clone()]
    );
    assert_eq!(
        store
            .list(
                "Q1",
                &StatusFilter::all().excluding(SubmissionStatus::Received)
            )
            .unwrap(),
        vec![b, c]
    );
}

#[test]
fn run_log_round_trips_through_the_document() {
    let (fs, mut store) = store();
    let id = store.create("Q1", json!({}), Some("local".into())).unwrap();

    store
        .update("Q1", &id, SubmissionField::RunLog(run_log("run-7")))
        .unwrap();

    // A second store over the same file sees the same record.
    let reopened = SubmissionStore::new(fs, STORE_PATH);
    let submission = reopened.get("Q1", &id).unwrap();
    assert_eq!(submission.run_log, Some(run_log("run-7")));
    assert_eq!(submission.wes_id.as_deref(), Some("local"));
}

#[test]
fn repeated_update_is_idempotent() {
    let (_fs, mut store) = store();
    let id = store.create("Q1", json!({}), None).unwrap();

    for _ in 0..2 {
        store
            .update("Q1", &id, SubmissionField::Status(SubmissionStatus::Submitted))
            .unwrap();
        store
            .update("Q1", &id, SubmissionField::RunLog(run_log("run-1")))
            .unwrap();
    }

    let submission = store.get("Q1", &id).unwrap();
    assert_eq!(submission.status, SubmissionStatus::Submitted);
    assert_eq!(submission.run_log, Some(run_log("run-1")));
}

#[test]
fn backward_transition_is_rejected_and_document_untouched() {
    let (fs, mut store) = store();
    let id = store.create("Q1", json!({}), None).unwrap();
    store
        .update("Q1", &id, SubmissionField::Status(SubmissionStatus::Submitted))
        .unwrap();
    store
        .update("Q1", &id, SubmissionField::Status(SubmissionStatus::Complete))
        .unwrap();
    let writes = fs.write_count(STORE_PATH);

    let result = store.update("Q1", &id, SubmissionField::Status(SubmissionStatus::Received));

    match result {
        Err(WesQueueError::InvalidTransition { from, to }) => {
            assert_eq!(from, SubmissionStatus::Complete);
            assert_eq!(to, SubmissionStatus::Received);
        }
        other => panic!("Expected InvalidTransition, got: {:?}", other),
    }
    assert_eq!(fs.write_count(STORE_PATH), writes);
    assert_eq!(
        store.get("Q1", &id).unwrap().status,
        SubmissionStatus::Complete
    );
}

#[test]
fn received_cannot_jump_to_terminal() {
    let (_fs, mut store) = store();
    let id = store.create("Q1", json!({}), None).unwrap();

    let result = store.update("Q1", &id, SubmissionField::Status(SubmissionStatus::Complete));
    assert!(matches!(
        result,
        Err(WesQueueError::InvalidTransition { .. })
    ));
}

#[test]
fn update_of_missing_submission_is_not_found() {
    let (_fs, mut store) = store();
    let result = store.update("Q1", "nope", SubmissionField::Data(json!({})));
    assert!(matches!(result, Err(WesQueueError::NotFound(_))));
}

#[test]
fn every_mutation_writes_the_whole_document_once() {
    let (fs, mut store) = store();
    let id = store.create("Q1", json!({}), None).unwrap();
    assert_eq!(fs.write_count(STORE_PATH), 1);

    store
        .update("Q1", &id, SubmissionField::WesId(Some("local".into())))
        .unwrap();
    assert_eq!(fs.write_count(STORE_PATH), 2);

    // Reads never write.
    store.list("Q1", &StatusFilter::all()).unwrap();
    store.get("Q1", &id).unwrap();
    assert_eq!(fs.write_count(STORE_PATH), 2);
}

#[test]
fn malformed_document_is_store_corruption() {
    let (fs, store) = store();
    fs.add_file(STORE_PATH, "{ not json");

    match store.list("Q1", &StatusFilter::all()) {
        Err(WesQueueError::StoreCorruption(msg)) => assert!(msg.contains(STORE_PATH)),
        other => panic!("Expected StoreCorruption, got: {:?}", other),
    }
}

#[test]
fn legacy_status_key_in_run_log_is_accepted() {
    let (fs, store) = store();
    fs.add_file(
        STORE_PATH,
        r#"{
  "Q1": {
    "20240101120000000000": {
      "status": "SUBMITTED",
      "data": {},
      "wes_id": "local",
      "run_log": {
        "run_id": "run-1",
        "status": "RUNNING",
        "start_time": "2024-01-01T12:00:00Z"
      }
    }
  }
}"#,
    );

    let submission = store.get("Q1", "20240101120000000000").unwrap();
    let run_log = submission.run_log.unwrap();
    assert_eq!(run_log.state, RunState::Running);
    assert_eq!(run_log.elapsed_time, None);
}
