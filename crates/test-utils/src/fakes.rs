use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use wesqueue::config::{QueueConfig, ServiceEndpoint};
use wesqueue::engine::Clock;
use wesqueue::errors::{Result, WesQueueError};
use wesqueue::notify::DownstreamNotifier;
use wesqueue::registry::{ResolvedWorkflow, WorkflowResolver, WorkflowTest};
use wesqueue::wes::WesLibrary;

/// Records every `(target_queue, wes_id)` notification.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<(String, String)>>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl DownstreamNotifier for RecordingNotifier {
    async fn notify(&self, target_queue: &str, wes_id: &str) -> Result<()> {
        if *self.fail.lock().unwrap() {
            return Err(WesQueueError::Transport("notifier unavailable".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push((target_queue.to_string(), wes_id.to_string()));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    lookups: Vec<String>,
    checkers: HashMap<String, String>,
    tests: Vec<WorkflowTest>,
    test_lookups: Vec<(String, String, String)>,
    unreachable: bool,
}

/// A fake tool registry that:
/// - resolves every queue to the same workflow and records lookups
/// - answers checker lookups from a registered workflow → checker map
/// - hands out the same test parameter files for every checker
#[derive(Debug, Clone)]
pub struct StaticResolver {
    resolved: ResolvedWorkflow,
    state: Arc<Mutex<RegistryState>>,
}

impl StaticResolver {
    pub fn new(workflow_url: &str, attachments: &[&str]) -> Self {
        Self {
            resolved: ResolvedWorkflow {
                workflow_url: workflow_url.to_string(),
                attachments: attachments.iter().map(|a| a.to_string()).collect(),
            },
            state: Arc::new(Mutex::new(RegistryState::default())),
        }
    }

    /// Queue ids resolved so far, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.state.lock().unwrap().lookups.clone()
    }

    pub fn register_checker(&self, workflow_id: &str, checker_id: &str) {
        self.state
            .lock()
            .unwrap()
            .checkers
            .insert(workflow_id.to_string(), checker_id.to_string());
    }

    pub fn set_tests(&self, tests: Vec<WorkflowTest>) {
        self.state.lock().unwrap().tests = tests;
    }

    /// `(workflow_id, version_id, workflow_type)` of every test lookup.
    pub fn test_lookups(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().test_lookups.clone()
    }

    pub fn unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }
}

#[async_trait]
impl WorkflowResolver for StaticResolver {
    async fn resolve(
        &self,
        queue_id: &str,
        _queue: &QueueConfig,
        _registry: &ServiceEndpoint,
    ) -> Result<ResolvedWorkflow> {
        self.state.lock().unwrap().lookups.push(queue_id.to_string());
        Ok(self.resolved.clone())
    }

    async fn service_info(&self, registry: &ServiceEndpoint) -> Result<Value> {
        if self.state.lock().unwrap().unreachable {
            return Err(WesQueueError::Transport(format!(
                "cannot reach {}",
                registry.base_url()
            )));
        }
        Ok(json!({ "type": { "artifact": "trs", "version": "2.0.0" } }))
    }

    async fn checker_id(&self, _registry: &ServiceEndpoint, workflow_id: &str) -> Result<String> {
        self.state
            .lock()
            .unwrap()
            .checkers
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| WesQueueError::NotFound(format!("checker workflow for '{workflow_id}'")))
    }

    async fn workflow_tests(
        &self,
        _registry: &ServiceEndpoint,
        workflow_id: &str,
        version_id: &str,
        workflow_type: &str,
    ) -> Result<Vec<WorkflowTest>> {
        let mut state = self.state.lock().unwrap();
        state.test_lookups.push((
            workflow_id.to_string(),
            version_id.to_string(),
            workflow_type.to_string(),
        ));
        Ok(state.tests.clone())
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Arguments of one `WesLibrary::run` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRun {
    pub wf: String,
    pub jsonyaml: String,
    pub attachments: Vec<String>,
    pub workflow_type: String,
    pub workflow_type_version: String,
}

/// A `WesLibrary` that records its positional arguments.
#[derive(Debug, Clone, Default)]
pub struct RecordingLibrary {
    pub list_args: Arc<Mutex<Vec<(String, String)>>>,
    pub runs: Arc<Mutex<Vec<LibraryRun>>>,
}

impl RecordingLibrary {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WesLibrary for RecordingLibrary {
    async fn get_service_info(&self) -> Result<Value> {
        Ok(json!({ "supported_wes_versions": ["1.0.0"] }))
    }

    async fn list_runs(&self, page_size: &str, page_token: &str) -> Result<Value> {
        self.list_args
            .lock()
            .unwrap()
            .push((page_size.to_string(), page_token.to_string()));
        Ok(json!({ "runs": [{ "run_id": "lib-1", "state": "RUNNING" }] }))
    }

    async fn run(
        &self,
        wf: &str,
        jsonyaml: &str,
        attachments: &[String],
        workflow_type: &str,
        workflow_type_version: &str,
    ) -> Result<Value> {
        self.runs.lock().unwrap().push(LibraryRun {
            wf: wf.to_string(),
            jsonyaml: jsonyaml.to_string(),
            attachments: attachments.to_vec(),
            workflow_type: workflow_type.to_string(),
            workflow_type_version: workflow_type_version.to_string(),
        });
        Ok(json!({ "run_id": "lib-1" }))
    }

    async fn cancel(&self, run_id: &str) -> Result<Value> {
        Ok(json!({ "run_id": run_id }))
    }

    async fn get_run_status(&self, run_id: &str) -> Result<Value> {
        Ok(json!({ "run_id": run_id, "state": "COMPLETE" }))
    }

    async fn get_run_log(&self, run_id: &str) -> Result<Value> {
        Ok(json!({ "run_id": run_id, "state": "COMPLETE", "outputs": {} }))
    }
}
