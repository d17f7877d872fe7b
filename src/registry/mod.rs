// src/registry/mod.rs

//! Workflow discovery through a tool registry.
//!
//! The orchestrator asks a registry for four things:
//!
//! - a queue's descriptor URL plus the URLs of its secondary descriptors;
//! - whether the registry answers at all;
//! - the checker workflow registered for a workflow;
//! - the test parameter files published for a workflow version.
//!
//! [`WorkflowResolver`] is that seam; [`TrsClient`] implements it against the
//! GA4GH TRS v2 API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{QueueConfig, ServiceEndpoint};
use crate::errors::Result;

pub mod trs;

pub use trs::{TrsClient, checker_id_from_url};

/// A workflow locator as returned by a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWorkflow {
    pub workflow_url: String,
    pub attachments: Vec<String>,
}

/// A test parameter file published for a workflow version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkflowTest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
}

impl WorkflowTest {
    /// Job parameters for a submission: inline JSON content when the
    /// registry ships it, else the file's URL as a parameter locator.
    pub fn payload(&self) -> Option<Value> {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&self.content) {
            return Some(value);
        }
        if !self.url.is_empty() {
            return Some(Value::String(self.url.clone()));
        }
        None
    }
}

#[async_trait]
pub trait WorkflowResolver: Send + Sync {
    async fn resolve(
        &self,
        queue_id: &str,
        queue: &QueueConfig,
        registry: &ServiceEndpoint,
    ) -> Result<ResolvedWorkflow>;

    /// Registry capability descriptor; any error means unreachable.
    async fn service_info(&self, registry: &ServiceEndpoint) -> Result<Value>;

    /// Id of the checker workflow registered for `workflow_id`.
    async fn checker_id(&self, registry: &ServiceEndpoint, workflow_id: &str) -> Result<String>;

    async fn workflow_tests(
        &self,
        registry: &ServiceEndpoint,
        workflow_id: &str,
        version_id: &str,
        workflow_type: &str,
    ) -> Result<Vec<WorkflowTest>>;
}
