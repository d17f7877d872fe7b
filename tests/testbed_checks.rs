// tests/testbed_checks.rs

mod common;
use crate::common::{init_tracing, single_queue_config, ConfigBuilder, QueueBuilder, TestHarness};

use serde_json::json;

use wesqueue::config::RawOrchestratorConfig;
use wesqueue::engine::{check_matrix, checker_queue_id};
use wesqueue::errors::WesQueueError;
use wesqueue::registry::WorkflowTest;
use wesqueue::store::StatusFilter;
use wesqueue::types::{RunState, SubmissionStatus};

const WORKFLOW: &str = "github.com/org/repo";
const CHECKER: &str = "github.com/org/repo/_cwl_checker";

fn registry_config() -> RawOrchestratorConfig {
    ConfigBuilder::new()
        .with_service("local", "localhost:8080")
        .with_service("remote", "remote.test:8080")
        .with_registry("dockstore", "dockstore.org:8443")
        .with_queue(
            "Q1",
            QueueBuilder::from_registry("dockstore", WORKFLOW, "main", "local")
                .wes_opt("remote")
                .build(),
        )
        .with_queue("Q2", QueueBuilder::new("local").build())
        .build_raw()
}

fn test_file(content: &str, url: &str) -> WorkflowTest {
    WorkflowTest {
        content: content.to_string(),
        url: url.to_string(),
    }
}

#[tokio::test]
async fn checker_runs_validate_the_checked_queue() {
    init_tracing();
    let harness = TestHarness::new(registry_config());
    harness.resolver.register_checker(WORKFLOW, CHECKER);
    harness.resolver.set_tests(vec![
        test_file(r#"{"input": "a.txt"}"#, ""),
        test_file("", "https://registry.test/test.2.json"),
    ]);
    harness.service("local").script(&[
        RunState::Running,
        RunState::Running,
        RunState::Complete,
        RunState::Complete,
    ]);
    let mut orchestrator = harness.orchestrator();

    let log = orchestrator.check_workflow("Q1", "local").await.unwrap();
    assert_eq!(log.len(), 2);

    let config = harness.config_store().load().unwrap();
    let checker = config.queue("Q1_checker").unwrap();
    assert_eq!(checker.workflow_id.as_deref(), Some(CHECKER));
    assert_eq!(checker.version_id.as_deref(), Some("main"));
    assert_eq!(checker.target_queue.as_deref(), Some("Q1"));
    assert_eq!(checker.wes_opts, vec!["local".to_string()]);
    assert_eq!(
        harness.resolver.test_lookups(),
        vec![(CHECKER.to_string(), "main".to_string(), "CWL".to_string())]
    );

    let requests = harness.service("local").run_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].workflow_params, json!({ "input": "a.txt" }));
    assert_eq!(
        requests[1].workflow_params,
        json!("https://registry.test/test.2.json")
    );

    orchestrator.monitor_queue("Q1_checker").await.unwrap();
    let store = harness.store();
    for id in log.keys() {
        assert_eq!(
            store.get("Q1_checker", id).unwrap().status,
            SubmissionStatus::Validated
        );
    }
    assert_eq!(
        harness.notifier.calls(),
        vec![
            ("Q1".to_string(), "local".to_string()),
            ("Q1".to_string(), "local".to_string()),
        ]
    );
}

#[tokio::test]
async fn check_all_covers_every_service_of_registry_queues() {
    init_tracing();
    let harness = TestHarness::new(registry_config());
    harness.resolver.register_checker(WORKFLOW, CHECKER);
    harness
        .resolver
        .set_tests(vec![test_file(r#"{"input": "a.txt"}"#, "")]);
    let mut orchestrator = harness.orchestrator();

    let matrix = check_matrix(&harness.config_store().load().unwrap());
    assert_eq!(matrix.len(), 1);
    assert_eq!(matrix["Q1"], vec!["local".to_string(), "remote".to_string()]);

    let log = orchestrator.check_all(&matrix).await.unwrap();
    assert_eq!(log["Q1"]["local"].len(), 1);
    assert_eq!(log["Q1"]["remote"].len(), 1);
    assert_eq!(harness.service("local").run_requests().len(), 1);
    assert_eq!(harness.service("remote").run_requests().len(), 1);

    let config = harness.config_store().load().unwrap();
    let checker = config.queue(&checker_queue_id("Q1")).unwrap();
    assert_eq!(checker.wes_opts, vec!["local".to_string(), "remote".to_string()]);
    assert_eq!(checker.wes_default, "remote");

    // The checker queue is not itself checked.
    let matrix = check_matrix(&config);
    assert!(matrix.keys().all(|queue_id| queue_id == "Q1"));
}

#[tokio::test]
async fn queue_without_registry_coordinates_cannot_be_checked() {
    init_tracing();
    let harness = TestHarness::new(single_queue_config(None));
    let mut orchestrator = harness.orchestrator();

    let result = orchestrator.check_workflow("Q1", "local").await;
    assert!(matches!(result, Err(WesQueueError::Config(_))));
    assert!(harness.config_store().load().unwrap().queue("Q1_checker").is_err());
}

#[tokio::test]
async fn workflow_without_checker_is_not_found() {
    init_tracing();
    let harness = TestHarness::new(registry_config());
    let mut orchestrator = harness.orchestrator();

    let result = orchestrator.check_workflow("Q1", "local").await;
    assert!(matches!(result, Err(WesQueueError::NotFound(_))));
    assert!(harness.service("local").run_requests().is_empty());
}

#[tokio::test]
async fn checker_without_test_files_queues_nothing() {
    init_tracing();
    let harness = TestHarness::new(registry_config());
    harness.resolver.register_checker(WORKFLOW, CHECKER);
    let mut orchestrator = harness.orchestrator();

    let result = orchestrator.check_workflow("Q1", "local").await;
    assert!(matches!(result, Err(WesQueueError::NotFound(_))));
    let ids = harness
        .store()
        .list("Q1_checker", &StatusFilter::all())
        .unwrap();
    assert!(ids.is_empty());
}
