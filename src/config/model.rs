// src/config/model.rs

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, WesQueueError};
use crate::types::{ClientKind, Proto};

/// Orchestrator configuration exactly as read from TOML.
///
/// ```toml
/// [queues.test_cwl_queue]
/// workflow_type = "CWL"
/// workflow_url = "file://tests/testdata/md5sum.cwl"
/// wes_default = "local"
/// wes_opts = ["local"]
///
/// [toolregistries.dockstore]
/// host = "dockstore.org:8443"
///
/// [workflowservices.local]
/// host = "0.0.0.0:8080"
/// proto = "http"
/// ```
///
/// All sections are optional. Tables keep their document order, which is
/// the order `run_all` and `monitor` walk queues in. Use [`OrchestratorConfig`] (obtained through
/// `TryFrom`) anywhere the invariants matter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawOrchestratorConfig {
    #[serde(default)]
    pub queues: IndexMap<String, QueueConfig>,

    #[serde(default)]
    pub toolregistries: IndexMap<String, ServiceEndpoint>,

    #[serde(default)]
    pub workflowservices: IndexMap<String, ServiceEndpoint>,
}

/// `[queues.<id>]` section: one workflow bound to its allowed services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueConfig {
    /// `CWL`, `WDL`, ...
    pub workflow_type: String,

    /// Tool registry used to resolve `workflow_id` when `workflow_url` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trs_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    /// Filled in lazily from the registry when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_url: Option<String>,

    #[serde(default)]
    pub workflow_attachments: Vec<String>,

    pub wes_default: String,

    #[serde(default)]
    pub wes_opts: Vec<String>,

    /// Queue that records a verification when a run here completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_queue: Option<String>,
}

impl QueueConfig {
    /// A queue with a directly known workflow URL and a single service.
    pub fn with_url(
        workflow_type: impl Into<String>,
        workflow_url: impl Into<String>,
        wes_default: impl Into<String>,
    ) -> Self {
        let wes_default = wes_default.into();
        Self {
            workflow_type: workflow_type.into(),
            trs_id: None,
            workflow_id: None,
            version_id: None,
            workflow_url: Some(workflow_url.into()),
            workflow_attachments: Vec::new(),
            wes_opts: vec![wes_default.clone()],
            wes_default,
            target_queue: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.workflow_url.is_some()
    }

    pub fn allows_service(&self, wes_id: &str) -> bool {
        self.wes_opts.iter().any(|opt| opt == wes_id)
    }
}

/// `[toolregistries.<id>]` / `[workflowservices.<id>]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceEndpoint {
    /// `host[:port]`, no scheme.
    pub host: String,

    #[serde(default)]
    pub proto: Proto,

    /// Sent verbatim as the `Authorization` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,

    /// Client strategy; only meaningful for workflow services.
    #[serde(default)]
    pub client: ClientKind,

    /// Override for where the API description is fetched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_url: Option<String>,
}

impl ServiceEndpoint {
    pub fn new(host: impl Into<String>, proto: Proto) -> Self {
        Self {
            host: host.into(),
            proto,
            auth: None,
            client: ClientKind::default(),
            spec_url: None,
        }
    }

    /// `proto://host`, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}",
            self.proto.as_str(),
            self.host.trim_end_matches('/')
        )
    }
}

/// Validated orchestrator configuration.
///
/// Built from [`RawOrchestratorConfig`] through `TryFrom`, which enforces the
/// cross-references between queues and services.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    raw: RawOrchestratorConfig,
}

impl OrchestratorConfig {
    pub(crate) fn new_unchecked(raw: RawOrchestratorConfig) -> Self {
        Self { raw }
    }

    pub fn queue_ids(&self) -> impl Iterator<Item = &str> {
        self.raw.queues.keys().map(String::as_str)
    }

    pub fn queues(&self) -> &IndexMap<String, QueueConfig> {
        &self.raw.queues
    }

    pub fn queue(&self, queue_id: &str) -> Result<&QueueConfig> {
        self.raw
            .queues
            .get(queue_id)
            .ok_or_else(|| WesQueueError::NotFound(format!("queue '{queue_id}'")))
    }

    pub fn workflow_services(&self) -> &IndexMap<String, ServiceEndpoint> {
        &self.raw.workflowservices
    }

    pub fn workflow_service(&self, wes_id: &str) -> Result<&ServiceEndpoint> {
        self.raw
            .workflowservices
            .get(wes_id)
            .ok_or_else(|| WesQueueError::NotFound(format!("workflow service '{wes_id}'")))
    }

    pub fn tool_registries(&self) -> &IndexMap<String, ServiceEndpoint> {
        &self.raw.toolregistries
    }

    pub fn tool_registry(&self, trs_id: &str) -> Result<&ServiceEndpoint> {
        self.raw
            .toolregistries
            .get(trs_id)
            .ok_or_else(|| WesQueueError::NotFound(format!("tool registry '{trs_id}'")))
    }

    pub fn as_raw(&self) -> &RawOrchestratorConfig {
        &self.raw
    }

    pub fn into_raw(self) -> RawOrchestratorConfig {
        self.raw
    }
}
