#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use wesqueue::config::{ConfigStore, OrchestratorConfig, QueueConfig, RawOrchestratorConfig, ServiceEndpoint};
use wesqueue::engine::Orchestrator;
use wesqueue::fs::MockFileSystem;
use wesqueue::store::SubmissionStore;
use wesqueue::types::Proto;

use crate::fake_service::{FakeConnector, FakeWorkflowService};
use crate::fakes::{ManualClock, RecordingNotifier, StaticResolver};

pub const CONFIG_PATH: &str = "wesqueue.toml";
pub const STORE_PATH: &str = "submission_queue.json";

/// Builder for `RawOrchestratorConfig` to simplify test setup.
pub struct ConfigBuilder {
    config: RawOrchestratorConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawOrchestratorConfig::default(),
        }
    }

    pub fn with_queue(mut self, queue_id: &str, queue: QueueConfig) -> Self {
        self.config.queues.insert(queue_id.to_string(), queue);
        self
    }

    /// A plain-HTTP execution service at `host`.
    pub fn with_service(mut self, wes_id: &str, host: &str) -> Self {
        self.config
            .workflowservices
            .insert(wes_id.to_string(), ServiceEndpoint::new(host, Proto::Http));
        self
    }

    pub fn with_registry(mut self, trs_id: &str, host: &str) -> Self {
        self.config
            .toolregistries
            .insert(trs_id.to_string(), ServiceEndpoint::new(host, Proto::Https));
        self
    }

    pub fn build_raw(self) -> RawOrchestratorConfig {
        self.config
    }

    pub fn build(self) -> OrchestratorConfig {
        OrchestratorConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `QueueConfig`.
pub struct QueueBuilder {
    queue: QueueConfig,
}

impl QueueBuilder {
    /// A CWL queue with a known workflow URL, bound to `wes_default`.
    pub fn new(wes_default: &str) -> Self {
        Self {
            queue: QueueConfig::with_url("CWL", "file://workflows/main.cwl", wes_default),
        }
    }

    /// A queue that must be resolved through `trs_id` before its first run.
    pub fn from_registry(trs_id: &str, workflow_id: &str, version_id: &str, wes_default: &str) -> Self {
        let mut queue = QueueConfig::with_url("CWL", "", wes_default);
        queue.workflow_url = None;
        queue.trs_id = Some(trs_id.to_string());
        queue.workflow_id = Some(workflow_id.to_string());
        queue.version_id = Some(version_id.to_string());
        Self { queue }
    }

    pub fn workflow_url(mut self, url: &str) -> Self {
        self.queue.workflow_url = Some(url.to_string());
        self
    }

    pub fn attachment(mut self, url: &str) -> Self {
        self.queue.workflow_attachments.push(url.to_string());
        self
    }

    pub fn wes_opt(mut self, wes_id: &str) -> Self {
        if !self.queue.allows_service(wes_id) {
            self.queue.wes_opts.push(wes_id.to_string());
        }
        self
    }

    pub fn target_queue(mut self, target: &str) -> Self {
        self.queue.target_queue = Some(target.to_string());
        self
    }

    pub fn build(self) -> QueueConfig {
        self.queue
    }
}

/// Fixed instant used as "now" by harness clocks.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// An orchestrator over an in-memory filesystem, with every collaborator
/// replaced by a fake the test can inspect.
pub struct TestHarness {
    pub fs: MockFileSystem,
    pub connector: FakeConnector,
    pub notifier: RecordingNotifier,
    pub resolver: StaticResolver,
    pub clock: ManualClock,
}

impl TestHarness {
    /// Write `config` to the mock filesystem and register a fake service
    /// for every configured execution service.
    pub fn new(config: RawOrchestratorConfig) -> Self {
        let fs = MockFileSystem::new();
        let connector = FakeConnector::new();
        for wes_id in config.workflowservices.keys() {
            connector.register(wes_id, FakeWorkflowService::new());
        }

        ConfigStore::new(fs.clone(), CONFIG_PATH)
            .save_raw(config)
            .expect("Failed to write harness config");

        Self {
            fs,
            connector,
            notifier: RecordingNotifier::new(),
            resolver: StaticResolver::new("https://registry.test/main.cwl", &[]),
            clock: ManualClock::new(epoch()),
        }
    }

    pub fn service(&self, wes_id: &str) -> FakeWorkflowService {
        self.connector
            .service(wes_id)
            .unwrap_or_else(|| panic!("no fake service registered for '{wes_id}'"))
    }

    pub fn config_store(&self) -> ConfigStore<MockFileSystem> {
        ConfigStore::new(self.fs.clone(), CONFIG_PATH)
    }

    pub fn store(&self) -> SubmissionStore<MockFileSystem> {
        SubmissionStore::new(self.fs.clone(), STORE_PATH)
    }

    pub fn orchestrator(&self) -> Orchestrator<MockFileSystem> {
        Orchestrator::new(
            self.config_store(),
            self.store(),
            self.connector.clone(),
            self.notifier.clone(),
        )
        .with_resolver(self.resolver.clone())
        .with_clock(self.clock.clone())
    }
}
