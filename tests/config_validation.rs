// tests/config_validation.rs

mod common;
use crate::common::{ConfigBuilder, QueueBuilder, CONFIG_PATH};

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use wesqueue::config::{load_and_validate, ConfigStore, QueueConfig, ServiceEndpoint};
use wesqueue::errors::WesQueueError;
use wesqueue::fs::{FileSystem, MockFileSystem};
use wesqueue::types::{ClientKind, Proto};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_valid_config_loads() {
    let file = write_config(
        r#"
[queues.md5]
workflow_type = "CWL"
workflow_url = "file://workflows/md5sum.cwl"
workflow_attachments = ["file://workflows/md5sum.input"]
wes_default = "local"
wes_opts = ["local", "cloud"]

[workflowservices.local]
host = "0.0.0.0:8080"
proto = "http"

[workflowservices.cloud]
host = "wes.example.org"
auth = "Bearer token"
client = "library"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    let queue = cfg.queue("md5").unwrap();
    assert_eq!(queue.wes_opts, vec!["local", "cloud"]);
    let cloud = cfg.workflow_service("cloud").unwrap();
    assert_eq!(cloud.proto, Proto::Https);
    assert_eq!(cloud.client, ClientKind::Library);
    assert_eq!(cloud.base_url(), "https://wes.example.org");
    assert_eq!(
        cfg.workflow_service("local").unwrap().base_url(),
        "http://0.0.0.0:8080"
    );
}

#[test]
fn test_downstream_cycle_returns_config_error() {
    let file = write_config(
        r#"
[queues.A]
workflow_type = "CWL"
workflow_url = "file://a.cwl"
wes_default = "local"
wes_opts = ["local"]
target_queue = "B"

[queues.B]
workflow_type = "CWL"
workflow_url = "file://b.cwl"
wes_default = "local"
wes_opts = ["local"]
target_queue = "A"

[workflowservices.local]
host = "localhost:8080"
"#,
    );

    match load_and_validate(file.path()) {
        Err(WesQueueError::Config(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('A') || msg.contains('B'));
        }
        Err(e) => panic!("Expected Config error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_service_in_wes_opts_is_rejected() {
    let raw = ConfigBuilder::new()
        .with_service("local", "localhost:8080")
        .with_queue("Q1", QueueBuilder::new("local").wes_opt("ghost").build())
        .build_raw();

    match wesqueue::config::OrchestratorConfig::try_from(raw) {
        Err(WesQueueError::Config(msg)) => assert!(msg.contains("ghost")),
        other => panic!("Expected Config error, got: {:?}", other),
    }
}

#[test]
fn test_default_service_must_be_an_option() {
    let mut queue = QueueBuilder::new("local").build();
    queue.wes_opts.clear();
    let raw = ConfigBuilder::new()
        .with_service("local", "localhost:8080")
        .with_queue("Q1", queue)
        .build_raw();

    match wesqueue::config::validate_config(&raw) {
        Err(WesQueueError::Config(msg)) => assert!(msg.contains("wes_default")),
        other => panic!("Expected Config error, got: {:?}", other),
    }
}

#[test]
fn test_host_with_scheme_is_rejected() {
    let raw = ConfigBuilder::new()
        .with_service("local", "http://localhost:8080")
        .with_queue("Q1", QueueBuilder::new("local").build())
        .build_raw();

    match wesqueue::config::validate_config(&raw) {
        Err(WesQueueError::Config(msg)) => assert!(msg.contains("scheme")),
        other => panic!("Expected Config error, got: {:?}", other),
    }
}

#[test]
fn test_host_with_path_is_rejected() {
    let raw = ConfigBuilder::new()
        .with_service("local", "localhost:8080/ga4gh")
        .with_queue("Q1", QueueBuilder::new("local").build())
        .build_raw();

    assert!(matches!(
        wesqueue::config::validate_config(&raw),
        Err(WesQueueError::Config(_))
    ));
}

#[test]
fn test_unresolvable_queue_is_rejected() {
    let mut queue = QueueBuilder::new("local").build();
    queue.workflow_url = None;
    queue.workflow_id = Some("github.com/org/repo".to_string());
    queue.trs_id = Some("missing".to_string());
    let raw = ConfigBuilder::new()
        .with_service("local", "localhost:8080")
        .with_queue("Q1", queue)
        .build_raw();

    match wesqueue::config::validate_config(&raw) {
        Err(WesQueueError::Config(msg)) => assert!(msg.contains("missing")),
        other => panic!("Expected Config error, got: {:?}", other),
    }
}

#[test]
fn test_malformed_toml_is_a_toml_error() {
    let file = write_config("[queues.Q1\nworkflow_type = ");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(WesQueueError::Toml(_))
    ));
}

#[test]
fn test_missing_config_is_created_with_defaults() {
    let fs = MockFileSystem::new();
    let store = ConfigStore::new(fs.clone(), CONFIG_PATH);

    let cfg = store.load().unwrap();

    assert!(fs.exists(Path::new(CONFIG_PATH)));
    assert!(cfg.queue("test_cwl_queue").is_ok());
    assert!(cfg.queue("test_wdl_queue").is_ok());
    assert!(cfg.tool_registry("dockstore").is_ok());
    assert_eq!(
        cfg.workflow_service("local").unwrap().base_url(),
        "http://0.0.0.0:8080"
    );
}

#[test]
fn test_add_queue_defaults_wes_opts_and_persists() {
    let fs = MockFileSystem::new();
    let store = ConfigStore::new(fs, CONFIG_PATH);

    let mut queue = QueueConfig::with_url("WDL", "https://example.org/hello.wdl", "local");
    queue.wes_opts.clear();
    store.add_queue("hello", queue).unwrap();

    let cfg = store.load().unwrap();
    assert_eq!(cfg.queue("hello").unwrap().wes_opts, vec!["local"]);
}

#[test]
fn test_add_queue_requires_a_workflow_source() {
    let store = ConfigStore::new(MockFileSystem::new(), CONFIG_PATH);
    let mut queue = QueueConfig::with_url("CWL", "", "local");
    queue.workflow_url = None;

    assert!(matches!(
        store.add_queue("empty", queue),
        Err(WesQueueError::Config(_))
    ));
}

#[test]
fn test_add_service_and_wes_opt_make_default() {
    let store = ConfigStore::new(MockFileSystem::new(), CONFIG_PATH);
    let mut cloud = ServiceEndpoint::new("wes.example.org", Proto::Https);
    cloud.auth = Some("Bearer abc".to_string());
    store.add_workflow_service("cloud", cloud).unwrap();

    store
        .add_wes_opt(&["test_cwl_queue".to_string()], "cloud", true)
        .unwrap();

    let cfg = store.load().unwrap();
    let queue = cfg.queue("test_cwl_queue").unwrap();
    assert_eq!(queue.wes_default, "cloud");
    assert_eq!(queue.wes_opts, vec!["local", "cloud"]);
    assert_eq!(
        cfg.workflow_service("cloud").unwrap().auth.as_deref(),
        Some("Bearer abc")
    );
}

#[test]
fn test_add_wes_opt_for_unknown_queue_is_not_found() {
    let store = ConfigStore::new(MockFileSystem::new(), CONFIG_PATH);
    assert!(matches!(
        store.add_wes_opt(&["nope".to_string()], "local", false),
        Err(WesQueueError::NotFound(_))
    ));
}

#[test]
fn test_add_registry_and_show() {
    let store = ConfigStore::new(MockFileSystem::new(), CONFIG_PATH);
    store
        .add_tool_registry(
            "workflowhub",
            ServiceEndpoint::new("workflowhub.eu", Proto::Https),
        )
        .unwrap();

    let text = store.show().unwrap();
    assert!(text.contains("Workflow Evaluation Queues"));
    assert!(text.contains("test_cwl_queue"));
    assert!(text.contains("workflowhub: workflowhub.eu"));
    assert!(text.contains("local: 0.0.0.0:8080"));
}

#[test]
fn test_invalid_edit_is_not_persisted() {
    let store = ConfigStore::new(MockFileSystem::new(), CONFIG_PATH);
    store.ensure_exists().unwrap();
    let before = store.load_raw().unwrap();

    let queue = QueueConfig::with_url("CWL", "file://x.cwl", "ghost");
    assert!(store.set_queue("bad", queue).is_err());

    assert_eq!(store.load_raw().unwrap(), before);
}

#[test]
fn test_queues_keep_document_order() {
    let file = write_config(
        r#"
[queues.zeta]
workflow_type = "CWL"
workflow_url = "file://workflows/z.cwl"
wes_default = "local"
wes_opts = ["local"]

[queues.alpha]
workflow_type = "CWL"
workflow_url = "file://workflows/a.cwl"
wes_default = "local"
wes_opts = ["local"]

[workflowservices.local]
host = "0.0.0.0:8080"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.queue_ids().collect::<Vec<_>>(), vec!["zeta", "alpha"]);

    // Survives a save through the config store.
    let fs = MockFileSystem::new();
    let store = ConfigStore::new(fs.clone(), CONFIG_PATH);
    store.save_raw(cfg.into_raw()).unwrap();
    store
        .set_queue("beta", QueueConfig::with_url("CWL", "file://workflows/b.cwl", "local"))
        .unwrap();
    let reloaded = store.load().unwrap();
    assert_eq!(
        reloaded.queue_ids().collect::<Vec<_>>(),
        vec!["zeta", "alpha", "beta"]
    );
}
