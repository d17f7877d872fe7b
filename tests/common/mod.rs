#![allow(dead_code)]

pub use wesqueue_test_utils::builders::{self, epoch, CONFIG_PATH, STORE_PATH};
pub use wesqueue_test_utils::{
    init_tracing, with_timeout, ConfigBuilder, FakeWorkflowService, QueueBuilder, ServiceCall,
    TestHarness,
};

use wesqueue::config::RawOrchestratorConfig;

/// One queue `Q1` on service `local`, optionally targeting `Q2`.
pub fn single_queue_config(target: Option<&str>) -> RawOrchestratorConfig {
    let mut q1 = QueueBuilder::new("local").attachment("file://workflows/helper.cwl");
    if let Some(target) = target {
        q1 = q1.target_queue(target);
    }

    ConfigBuilder::new()
        .with_service("local", "localhost:8080")
        .with_queue("Q1", q1.build())
        .with_queue("Q2", QueueBuilder::new("local").build())
        .build_raw()
}
