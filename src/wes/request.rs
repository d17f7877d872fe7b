// src/wes/request.rs

//! Building the multipart body of a WES `RunWorkflow` call.

use std::path::Path;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, WesQueueError};

/// Inputs for a single fully-specified run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRun {
    pub workflow_url: String,
    /// Serialized JSON parameter document.
    pub workflow_params: String,
    pub workflow_type: String,
    pub workflow_type_version: String,
    pub attachments: Vec<String>,
}

impl WorkflowRun {
    /// Assemble the `multipart/form-data` body expected by `POST /runs`.
    ///
    /// `file://` attachments are read from disk and remote ones downloaded,
    /// so the service receives attachment bytes either way.
    ///
    /// A local `file://` workflow is uploaded as the first attachment and
    /// referenced by its file name, which the service resolves against the
    /// uploaded files.
    pub async fn into_form(self, http: &Client) -> Result<Form> {
        let mut attachments = self.attachments;
        let local_name = self.workflow_url.strip_prefix("file://").map(file_name);
        let workflow_url = match local_name {
            Some(name) => {
                attachments.retain(|locator| *locator != self.workflow_url);
                attachments.insert(0, self.workflow_url);
                name
            }
            None => self.workflow_url,
        };

        let mut form = Form::new()
            .text("workflow_params", self.workflow_params)
            .text("workflow_type", self.workflow_type)
            .text("workflow_type_version", self.workflow_type_version)
            .text("workflow_url", workflow_url);

        for locator in attachments {
            let part = attachment_part(http, &locator).await?;
            form = form.part("workflow_attachment", part);
        }

        Ok(form)
    }
}

/// Resolve a parameter payload into JSON text.
///
/// A string payload is treated as a locator: `file://` paths are read from
/// disk, `http(s)://` URLs fetched, and anything else parsed as inline JSON
/// text. The empty string means "no parameters". Non-string payloads are
/// serialized as-is.
pub async fn resolve_params(http: &Client, params: &str) -> Result<String> {
    let params = params.trim();
    if params.is_empty() {
        return Ok("{}".to_string());
    }

    let text = if let Some(path) = params.strip_prefix("file://") {
        tokio::fs::read_to_string(path).await.map_err(|e| {
            WesQueueError::Submission(format!("reading workflow params '{params}': {e}"))
        })?
    } else if params.starts_with("http://") || params.starts_with("https://") {
        fetch_text(http, params).await?
    } else {
        params.to_string()
    };

    let value: Value = serde_json::from_str(&text).map_err(|e| {
        WesQueueError::Submission(format!("workflow params are not valid JSON: {e}"))
    })?;
    Ok(value.to_string())
}

/// Render a submission's payload the way a client library expects it:
/// strings pass through untouched, `null` becomes the empty string.
pub fn params_argument(params: &Value) -> String {
    match params {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Guess `(workflow_type, workflow_type_version)` from a workflow URL.
pub fn infer_workflow_type(workflow_url: &str) -> Option<(&'static str, &'static str)> {
    let path = workflow_url.split(['?', '#']).next().unwrap_or(workflow_url);
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "cwl" => Some(("CWL", "v1.0")),
        "wdl" => Some(("WDL", "1.0")),
        "py" => Some(("PY", "2.7")),
        _ => None,
    }
}

async fn attachment_part(http: &Client, locator: &str) -> Result<Part> {
    let (bytes, name) = if let Some(path) = locator.strip_prefix("file://") {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            WesQueueError::Submission(format!("reading attachment '{locator}': {e}"))
        })?;
        (bytes, file_name(path))
    } else {
        let response = http
            .get(locator)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| WesQueueError::Transport(format!("fetching attachment '{locator}': {e}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| WesQueueError::Transport(format!("fetching attachment '{locator}': {e}")))?;
        (bytes.to_vec(), file_name(locator))
    };

    debug!(attachment = %locator, size = bytes.len(), "attaching file");
    Ok(Part::bytes(bytes).file_name(name))
}

async fn fetch_text(http: &Client, url: &str) -> Result<String> {
    let response = http
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| WesQueueError::Transport(format!("fetching '{url}': {e}")))?;
    response
        .text()
        .await
        .map_err(|e| WesQueueError::Transport(format!("fetching '{url}': {e}")))
}

fn file_name(locator: &str) -> String {
    locator
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(locator)
        .to_string()
}
