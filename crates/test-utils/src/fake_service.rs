use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use wesqueue::config::ServiceEndpoint;
use wesqueue::errors::{Result, WesQueueError};
use wesqueue::types::RunState;
use wesqueue::wes::{RunReceipt, RunRequest, RunStatus, ServiceConnector, WorkflowService};

/// A call observed by [`FakeWorkflowService`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    ServiceInfo,
    ListRuns,
    RunWorkflow(RunRequest),
    Cancel(String),
    Status(String),
    RunLog(String),
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<ServiceCall>,
    next_run: usize,
    /// States handed out by `get_run_status`, front first. The last one
    /// repeats once the script runs dry.
    script: VecDeque<RunState>,
    last_state: RunState,
    reject_runs: bool,
    fail_status: bool,
    fail_info: bool,
}

/// A fake execution service that:
/// - records every canonical call
/// - hands out `run-1`, `run-2`, ... as run ids
/// - answers status polls from a scripted list of states
///
/// Clones share the same state, so a test can keep one handle while the
/// orchestrator holds another.
#[derive(Debug, Clone, Default)]
pub struct FakeWorkflowService {
    state: Arc<Mutex<FakeState>>,
}

impl FakeWorkflowService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue states for upcoming status polls.
    pub fn script(&self, states: &[RunState]) {
        self.lock().script.extend(states.iter().copied());
    }

    pub fn reject_runs(&self, reject: bool) {
        self.lock().reject_runs = reject;
    }

    pub fn fail_status(&self, fail: bool) {
        self.lock().fail_status = fail;
    }

    pub fn fail_info(&self, fail: bool) {
        self.lock().fail_info = fail;
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.lock().calls.clone()
    }

    pub fn run_requests(&self) -> Vec<RunRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ServiceCall::RunWorkflow(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn status_polls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ServiceCall::Status(_)))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl WorkflowService for FakeWorkflowService {
    async fn get_service_info(&self) -> Result<Value> {
        let mut state = self.lock();
        state.calls.push(ServiceCall::ServiceInfo);
        if state.fail_info {
            return Err(WesQueueError::Transport("service unreachable".to_string()));
        }
        Ok(json!({ "workflow_type_versions": { "CWL": { "workflow_type_version": ["v1.0"] } } }))
    }

    async fn list_runs(&self) -> Result<Vec<RunStatus>> {
        let mut state = self.lock();
        state.calls.push(ServiceCall::ListRuns);
        let last = state.last_state;
        Ok((1..=state.next_run)
            .map(|n| RunStatus::new(format!("run-{n}"), last))
            .collect())
    }

    async fn run_workflow(&self, request: &RunRequest) -> Result<RunReceipt> {
        let mut state = self.lock();
        state.calls.push(ServiceCall::RunWorkflow(request.clone()));
        if state.reject_runs {
            return Err(WesQueueError::Submission("run rejected".to_string()));
        }
        state.next_run += 1;
        Ok(RunReceipt::new(format!("run-{}", state.next_run)))
    }

    async fn cancel_run(&self, run_id: &str) -> Result<Value> {
        let mut state = self.lock();
        state.calls.push(ServiceCall::Cancel(run_id.to_string()));
        Ok(json!({ "run_id": run_id }))
    }

    async fn get_run_status(&self, run_id: &str) -> Result<RunStatus> {
        let mut state = self.lock();
        state.calls.push(ServiceCall::Status(run_id.to_string()));
        if state.fail_status {
            return Err(WesQueueError::Transport("connection refused".to_string()));
        }
        if let Some(next) = state.script.pop_front() {
            state.last_state = next;
        }
        Ok(RunStatus::new(run_id, state.last_state))
    }

    async fn get_run_log(&self, run_id: &str) -> Result<Value> {
        let mut state = self.lock();
        state.calls.push(ServiceCall::RunLog(run_id.to_string()));
        Ok(json!({ "run_id": run_id, "state": state.last_state }))
    }
}

/// Hands out registered [`FakeWorkflowService`]s by execution-service id.
///
/// Connecting to an unregistered id fails like an unreachable endpoint.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    services: Arc<Mutex<HashMap<String, FakeWorkflowService>>>,
    connects: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, wes_id: &str, service: FakeWorkflowService) {
        self.services
            .lock()
            .unwrap()
            .insert(wes_id.to_string(), service);
    }

    pub fn service(&self, wes_id: &str) -> Option<FakeWorkflowService> {
        self.services.lock().unwrap().get(wes_id).cloned()
    }

    /// Execution-service ids in connect order.
    pub fn connects(&self) -> Vec<String> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceConnector for FakeConnector {
    async fn connect(
        &self,
        wes_id: &str,
        endpoint: &ServiceEndpoint,
    ) -> Result<Arc<dyn WorkflowService>> {
        self.connects.lock().unwrap().push(wes_id.to_string());
        let service = self.service(wes_id).ok_or_else(|| {
            WesQueueError::Transport(format!("cannot reach {}", endpoint.base_url()))
        })?;
        Ok(Arc::new(service))
    }
}
