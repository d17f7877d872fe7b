// src/wes/contract.rs

//! Generic client driven by the endpoint's published API description.
//!
//! The description (Swagger 2 or OpenAPI 3, JSON) is fetched once at
//! connect time. Canonical verbs are then dispatched by `operationId`, so
//! the client follows whatever base path and routes the service declares.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ServiceEndpoint;
use crate::errors::{Result, WesQueueError};
use crate::wes::request::{WorkflowRun, infer_workflow_type, params_argument, resolve_params};
use crate::wes::transport::{Envelope, HttpTransport};
use crate::wes::{RunReceipt, RunRequest, RunStatus, WorkflowService, run_summaries};

/// Where the API description lives when the endpoint does not say otherwise.
pub const DEFAULT_SPEC_PATH: &str = "/ga4gh/wes/v1/swagger.json";

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

static PATH_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([^{}]+)\}").expect("path parameter pattern is valid")
});

const HTTP_METHODS: [&str; 5] = ["get", "post", "put", "delete", "patch"];

/// One routable operation from the description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub method: Method,
    /// Path template relative to the base path, e.g. `/runs/{run_id}`.
    pub path: String,
}

/// Operations of an API description, keyed by `operationId`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiContract {
    base_path: String,
    operations: HashMap<String, Operation>,
}

impl ApiContract {
    pub fn from_document(doc: &Value) -> Result<Self> {
        let paths = doc
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| WesQueueError::Contract("API description has no `paths`".to_string()))?;

        let mut operations = HashMap::new();
        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            for method_name in HTTP_METHODS {
                let Some(op_id) = item
                    .get(method_name)
                    .and_then(|op| op.get("operationId"))
                    .and_then(Value::as_str)
                else {
                    continue;
                };
                let method = Method::from_bytes(method_name.to_uppercase().as_bytes())
                    .map_err(|e| WesQueueError::Contract(e.to_string()))?;
                operations.insert(
                    op_id.to_string(),
                    Operation {
                        method,
                        path: path.clone(),
                    },
                );
            }
        }

        Ok(Self {
            base_path: base_path(doc),
            operations,
        })
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn operation(&self, operation_id: &str) -> Result<&Operation> {
        self.operations.get(operation_id).ok_or_else(|| {
            WesQueueError::Contract(format!("API description has no operation '{operation_id}'"))
        })
    }

    /// Method and concrete path for an operation, with path parameters
    /// substituted and percent-encoded.
    pub fn resolve(&self, operation_id: &str, params: &[(&str, &str)]) -> Result<(Method, String)> {
        let op = self.operation(operation_id)?;

        for caps in PATH_PARAM.captures_iter(&op.path) {
            let name = &caps[1];
            if !params.iter().any(|(key, _)| *key == name) {
                return Err(WesQueueError::Contract(format!(
                    "operation '{operation_id}' needs path parameter '{name}'"
                )));
            }
        }

        let path = PATH_PARAM.replace_all(&op.path, |caps: &regex::Captures<'_>| {
            let value = params
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map(|(_, value)| *value)
                .unwrap_or_default();
            utf8_percent_encode(value, PATH_SEGMENT).to_string()
        });

        Ok((op.method.clone(), format!("{}{}", self.base_path, path)))
    }
}

/// `basePath` (Swagger 2) or the first `servers[].url` (OpenAPI 3).
fn base_path(doc: &Value) -> String {
    let raw = doc
        .get("basePath")
        .and_then(Value::as_str)
        .or_else(|| {
            doc.get("servers")
                .and_then(Value::as_array)
                .and_then(|servers| servers.first())
                .and_then(|server| server.get("url"))
                .and_then(Value::as_str)
        })
        .unwrap_or("");
    raw.trim_end_matches('/').to_string()
}

/// [`WorkflowService`] backed by an [`ApiContract`].
#[derive(Debug, Clone)]
pub struct ContractClient {
    transport: HttpTransport,
    contract: ApiContract,
}

impl ContractClient {
    pub fn new(transport: HttpTransport, contract: ApiContract) -> Self {
        Self {
            transport,
            contract,
        }
    }

    /// Fetch the endpoint's API description and build a client from it.
    pub async fn connect(endpoint: &ServiceEndpoint) -> Result<Self> {
        let transport = HttpTransport::new(endpoint)?;
        let spec_url = endpoint
            .spec_url
            .clone()
            .unwrap_or_else(|| transport.url(DEFAULT_SPEC_PATH));

        info!(url = %spec_url, "loading API description");
        let envelope = transport
            .send(transport.request(Method::GET, &spec_url))
            .await?;
        let doc = envelope.into_json().map_err(|e| match e {
            WesQueueError::NotFound(what) => {
                WesQueueError::Contract(format!("no API description at {what}"))
            }
            other => other,
        })?;

        let contract = ApiContract::from_document(&doc)?;
        debug!(
            base_path = %contract.base_path(),
            operations = contract.operations.len(),
            "API description loaded"
        );
        Ok(Self::new(transport, contract))
    }

    pub fn contract(&self) -> &ApiContract {
        &self.contract
    }

    async fn call(&self, operation_id: &str, params: &[(&str, &str)]) -> Result<Envelope> {
        let (method, path) = self.contract.resolve(operation_id, params)?;
        debug!(operation = operation_id, %path, "invoking operation");
        self.transport
            .send(self.transport.request(method, &path))
            .await
    }
}

#[async_trait]
impl WorkflowService for ContractClient {
    async fn get_service_info(&self) -> Result<Value> {
        self.call("GetServiceInfo", &[]).await?.into_json()
    }

    async fn list_runs(&self) -> Result<Vec<RunStatus>> {
        run_summaries(self.call("ListRuns", &[]).await?.into_json()?)
    }

    async fn run_workflow(&self, request: &RunRequest) -> Result<RunReceipt> {
        let inferred = infer_workflow_type(&request.workflow_url);
        let workflow_type = request
            .workflow_type
            .clone()
            .or_else(|| inferred.map(|(t, _)| t.to_string()))
            .ok_or_else(|| {
                WesQueueError::Submission(format!(
                    "cannot determine workflow type for '{}'",
                    request.workflow_url
                ))
            })?;
        let workflow_type_version = request
            .workflow_type_version
            .clone()
            .or_else(|| inferred.map(|(_, v)| v.to_string()))
            .unwrap_or_default();

        let http = self.transport.client();
        let run = WorkflowRun {
            workflow_url: request.workflow_url.clone(),
            workflow_params: resolve_params(http, &params_argument(&request.workflow_params)).await?,
            workflow_type,
            workflow_type_version,
            attachments: request.attachments.clone(),
        };
        let form = run.into_form(http).await?;

        let (method, path) = self.contract.resolve("RunWorkflow", &[])?;
        let envelope = self
            .transport
            .send(self.transport.request(method, &path).multipart(form))
            .await?;
        RunReceipt::from_value(envelope.into_submission_json()?)
    }

    async fn cancel_run(&self, run_id: &str) -> Result<Value> {
        self.call("CancelRun", &[("run_id", run_id)])
            .await?
            .into_json()
    }

    async fn get_run_status(&self, run_id: &str) -> Result<RunStatus> {
        RunStatus::from_value(
            self.call("GetRunStatus", &[("run_id", run_id)])
                .await?
                .into_json()?,
        )
    }

    async fn get_run_log(&self, run_id: &str) -> Result<Value> {
        self.call("GetRunLog", &[("run_id", run_id)])
            .await?
            .into_json()
    }
}
