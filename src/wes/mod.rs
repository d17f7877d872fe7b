// src/wes/mod.rs

//! Execution-service adapter layer.
//!
//! Every remote execution service is reached through the canonical
//! [`WorkflowService`] verbs, whatever client backs it:
//!
//! - [`contract`]: generic client built from the API description the
//!   endpoint publishes.
//! - [`library`]: purpose-built WES client plus the [`LibraryAdapter`]
//!   translation layer.
//! - [`pool`]: picks the strategy per endpoint and keeps one live client
//!   per execution-service id.
//! - [`transport`] / [`request`]: HTTP plumbing both strategies share.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, WesQueueError};
use crate::types::RunState;

pub mod contract;
pub mod library;
pub mod pool;
pub mod request;
pub mod transport;

pub use contract::{ApiContract, ContractClient};
pub use library::{HttpWesLibrary, LibraryAdapter, WesLibrary};
pub use pool::{EndpointConnector, ServiceConnector, ServicePool};
pub use transport::{Envelope, HttpTransport};

/// A run request in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub workflow_url: String,
    /// Inline JSON, or a string locator for a parameter file.
    pub workflow_params: Value,
    pub attachments: Vec<String>,
    pub workflow_type: Option<String>,
    pub workflow_type_version: Option<String>,
}

impl RunRequest {
    pub fn new(workflow_url: impl Into<String>, workflow_params: Value) -> Self {
        Self {
            workflow_url: workflow_url.into(),
            workflow_params,
            attachments: Vec::new(),
            workflow_type: None,
            workflow_type_version: None,
        }
    }
}

/// Result of a successful `run_workflow`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReceipt {
    pub run_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunReceipt {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            extra: Map::new(),
        }
    }

    /// Any value without a string `run_id` counts as a rejected submission.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            WesQueueError::Submission(format!("run response lacks a run_id: {e}"))
        })
    }
}

/// `{run_id, state}` snapshot of a remote run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub run_id: String,
    #[serde(default)]
    pub state: RunState,
}

impl RunStatus {
    pub fn new(run_id: impl Into<String>, state: RunState) -> Self {
        Self {
            run_id: run_id.into(),
            state,
        }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| WesQueueError::Transport(format!("malformed run status: {e}")))
    }
}

/// Pull the run summaries out of a `ListRuns` response.
///
/// Accepts both the WES `{ "runs": [...] }` wrapper and a bare array.
pub fn run_summaries(value: Value) -> Result<Vec<RunStatus>> {
    let runs = match value {
        Value::Object(mut map) => map.remove("runs").unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    serde_json::from_value(runs)
        .map_err(|e| WesQueueError::Transport(format!("malformed run list: {e}")))
}

/// Canonical capability set of an execution service.
#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// Service capability descriptor.
    async fn get_service_info(&self) -> Result<Value>;

    async fn list_runs(&self) -> Result<Vec<RunStatus>>;

    /// Submit a run. Rejections surface as `Submission` and are not retried.
    async fn run_workflow(&self, request: &RunRequest) -> Result<RunReceipt>;

    /// Cancellation acknowledgement.
    async fn cancel_run(&self, run_id: &str) -> Result<Value>;

    /// Unknown run ids fail with `NotFound`.
    async fn get_run_status(&self, run_id: &str) -> Result<RunStatus>;

    /// Full run record: request, state, task logs, outputs.
    async fn get_run_log(&self, run_id: &str) -> Result<Value>;
}
