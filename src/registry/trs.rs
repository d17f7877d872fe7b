// src/registry/trs.rs

use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{QueueConfig, ServiceEndpoint};
use crate::errors::{Result, WesQueueError};
use crate::registry::{ResolvedWorkflow, WorkflowResolver, WorkflowTest};
use crate::wes::HttpTransport;

pub const TRS_BASE_PATH: &str = "/api/ga4gh/v2";

const WORKFLOW_PREFIX: &str = "#workflow/";

#[derive(Debug, Deserialize)]
struct Descriptor {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ToolFile {
    path: String,
    file_type: String,
}

#[derive(Debug, Deserialize)]
struct Tool {
    #[serde(default)]
    checker_url: Option<String>,
}

/// GA4GH TRS v2 resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrsClient;

impl TrsClient {
    pub fn new() -> Self {
        Self
    }

    /// `/tools/{id}/versions/{version}/{TYPE}` for a queue.
    fn version_path(queue_id: &str, queue: &QueueConfig) -> Result<String> {
        let workflow_id = queue.workflow_id.as_deref().ok_or_else(|| {
            WesQueueError::Config(format!("queue '{queue_id}' has no workflow_id to resolve"))
        })?;
        let version_id = queue.version_id.as_deref().ok_or_else(|| {
            WesQueueError::Config(format!("queue '{queue_id}' has no version_id to resolve"))
        })?;
        Ok(tool_version_path(workflow_id, version_id, &queue.workflow_type))
    }

    async fn get<T: serde::de::DeserializeOwned>(
        transport: &HttpTransport,
        path: &str,
    ) -> Result<T> {
        let value: Value = transport
            .send(transport.request(Method::GET, path))
            .await?
            .into_json()?;
        serde_json::from_value(value)
            .map_err(|e| WesQueueError::Transport(format!("malformed TRS response for {path}: {e}")))
    }
}

#[async_trait]
impl WorkflowResolver for TrsClient {
    async fn resolve(
        &self,
        queue_id: &str,
        queue: &QueueConfig,
        registry: &ServiceEndpoint,
    ) -> Result<ResolvedWorkflow> {
        let transport = HttpTransport::new(registry)?;
        let version_path = Self::version_path(queue_id, queue)?;

        info!(
            queue = %queue_id,
            registry = %registry.host,
            workflow = ?queue.workflow_id,
            version = ?queue.version_id,
            "resolving workflow from tool registry"
        );

        let descriptor: Descriptor =
            Self::get(&transport, &format!("{version_path}/descriptor")).await?;
        let files: Vec<ToolFile> = Self::get(&transport, &format!("{version_path}/files")).await?;

        let mut attachments = Vec::new();
        for file in files
            .iter()
            .filter(|f| f.file_type == "SECONDARY_DESCRIPTOR")
        {
            let relative: Descriptor = Self::get(
                &transport,
                &format!("{version_path}/descriptor/{}", encode(&file.path)),
            )
            .await?;
            debug!(path = %file.path, url = %relative.url, "resolved secondary descriptor");
            attachments.push(relative.url);
        }

        Ok(ResolvedWorkflow {
            workflow_url: descriptor.url,
            attachments,
        })
    }

    async fn service_info(&self, registry: &ServiceEndpoint) -> Result<Value> {
        let transport = HttpTransport::new(registry)?;
        Self::get(&transport, &format!("{TRS_BASE_PATH}/service-info")).await
    }

    async fn checker_id(&self, registry: &ServiceEndpoint, workflow_id: &str) -> Result<String> {
        let transport = HttpTransport::new(registry)?;
        let tool: Tool = Self::get(
            &transport,
            &format!("{TRS_BASE_PATH}/tools/{}", encode(&tool_id(workflow_id))),
        )
        .await?;

        let checker_url = tool
            .checker_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                WesQueueError::NotFound(format!("checker workflow for '{workflow_id}'"))
            })?;
        let checker_id = checker_id_from_url(&checker_url).ok_or_else(|| {
            WesQueueError::Transport(format!(
                "checker_url '{checker_url}' of '{workflow_id}' names no workflow"
            ))
        })?;
        debug!(workflow = %workflow_id, checker = %checker_id, "found checker workflow");
        Ok(checker_id)
    }

    async fn workflow_tests(
        &self,
        registry: &ServiceEndpoint,
        workflow_id: &str,
        version_id: &str,
        workflow_type: &str,
    ) -> Result<Vec<WorkflowTest>> {
        let transport = HttpTransport::new(registry)?;
        let path = tool_version_path(workflow_id, version_id, workflow_type);
        Self::get(&transport, &format!("{path}/tests")).await
    }
}

/// Workflow id carried by a TRS `checker_url`, e.g.
/// `/%23workflow%2Fgithub.com%2Forg%2Frepo%2F_cwl_checker` gives
/// `github.com/org/repo/_cwl_checker`.
pub fn checker_id_from_url(checker_url: &str) -> Option<String> {
    let decoded = percent_decode_str(checker_url).decode_utf8_lossy();
    let (_, id) = decoded.split_once(WORKFLOW_PREFIX)?;
    let id = id.trim_end_matches('/');
    (!id.is_empty()).then(|| id.to_string())
}

fn tool_id(workflow_id: &str) -> String {
    if workflow_id.starts_with('#') {
        workflow_id.to_string()
    } else {
        format!("{WORKFLOW_PREFIX}{workflow_id}")
    }
}

fn tool_version_path(workflow_id: &str, version_id: &str, workflow_type: &str) -> String {
    format!(
        "{TRS_BASE_PATH}/tools/{}/versions/{}/{}",
        encode(&tool_id(workflow_id)),
        encode(version_id),
        workflow_type.to_uppercase()
    )
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, NON_ALPHANUMERIC).to_string()
}
