// tests/monitor_loop.rs

mod common;
use crate::common::{init_tracing, single_queue_config, with_timeout, TestHarness};

use serde_json::json;
use tokio::sync::watch;
use tokio::time::Duration;

use wesqueue::types::RunState;

#[tokio::test]
async fn monitor_stops_promptly_on_stop_signal() {
    init_tracing();
    let harness = TestHarness::new(single_queue_config(None));
    harness.service("local").script(&[RunState::Running]);
    let mut orchestrator = harness.orchestrator();

    let id = orchestrator.create_submission("Q1", json!({}), None).unwrap();
    orchestrator.run_queue("Q1", None).await.unwrap();

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = stop_tx.send(true);
    });

    // The interval is far longer than the test timeout; only the stop
    // signal can end the wait.
    let mut out = Vec::new();
    let summary = with_timeout(orchestrator.monitor(Duration::from_secs(3600), stop_rx, &mut out))
        .await
        .unwrap();

    assert_eq!(summary.passes, 1);
    assert_eq!(summary.submissions, 1);
    assert_eq!(summary.active, 1);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(&id));
    assert!(text.contains("RUNNING"));
    assert!(text.contains("(Press CTRL+C to quit)"));
    assert!(!text.contains("No jobs running..."));
    assert!(text.contains("Done: 1 pass(es)"));
}

#[tokio::test]
async fn monitor_does_not_start_a_pass_when_already_stopped() {
    init_tracing();
    let harness = TestHarness::new(single_queue_config(None));
    let mut orchestrator = harness.orchestrator();

    let (_stop_tx, stop_rx) = watch::channel(true);
    let mut out = Vec::new();
    let summary = with_timeout(orchestrator.monitor(Duration::from_secs(3600), stop_rx, &mut out))
        .await
        .unwrap();

    assert_eq!(summary.passes, 0);
    assert_eq!(harness.service("local").status_polls(), 0);
}

#[tokio::test]
async fn monitor_ends_when_stop_sender_is_dropped() {
    init_tracing();
    let harness = TestHarness::new(single_queue_config(None));
    let mut orchestrator = harness.orchestrator();

    let (stop_tx, stop_rx) = watch::channel(false);
    drop(stop_tx);

    let mut out = Vec::new();
    let summary = with_timeout(orchestrator.monitor(Duration::from_secs(3600), stop_rx, &mut out))
        .await
        .unwrap();

    assert_eq!(summary.passes, 1);
}

#[tokio::test]
async fn monitor_keeps_polling_until_runs_finish() {
    init_tracing();
    let harness = TestHarness::new(single_queue_config(None));
    let service = harness.service("local");
    service.script(&[RunState::Running, RunState::Running, RunState::Complete]);
    let mut orchestrator = harness.orchestrator();

    orchestrator.create_submission("Q1", json!({}), None).unwrap();
    orchestrator.run_queue("Q1", None).await.unwrap();

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = stop_tx.send(true);
    });

    let mut out = Vec::new();
    let summary = with_timeout(orchestrator.monitor(Duration::from_millis(10), stop_rx, &mut out))
        .await
        .unwrap();

    assert!(summary.passes >= 2);
    assert_eq!(summary.active, 0);
    // The terminal submission is no longer polled: one initial poll plus
    // two monitor polls.
    assert_eq!(service.status_polls(), 3);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("COMPLETE"));
    assert!(text.contains("No jobs running..."));
}

#[tokio::test]
async fn unreachable_binding_does_not_end_the_loop() {
    init_tracing();
    let harness = TestHarness::new(single_queue_config(None));
    let mut orchestrator = harness.orchestrator();

    // Q1 has a submitted record bound to a service that is not configured.
    let id = orchestrator.create_submission("Q1", json!({}), None).unwrap();
    orchestrator.run_queue("Q1", None).await.unwrap();
    let mut store = harness.store();
    store
        .update(
            "Q1",
            &id,
            wesqueue::store::SubmissionField::WesId(Some("gone".to_string())),
        )
        .unwrap();

    let (stop_tx, stop_rx) = watch::channel(false);
    drop(stop_tx);
    let mut out = Vec::new();
    let summary = with_timeout(orchestrator.monitor(Duration::from_secs(3600), stop_rx, &mut out))
        .await
        .unwrap();

    assert_eq!(summary.passes, 1);
    // The record is still reported with its previous run log.
    assert_eq!(summary.submissions, 1);
}
