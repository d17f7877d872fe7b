// src/wes/library.rs

//! Purpose-built WES client and the adapter that maps it onto the
//! canonical verbs.
//!
//! [`WesLibrary`] mirrors the calling convention of the classic WES client
//! library: different method names, positional string arguments, and
//! untyped JSON results. [`LibraryAdapter`] translates each canonical verb
//! into the matching library call, passing `""` for every argument the
//! canonical request does not carry.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::config::ServiceEndpoint;
use crate::errors::{Result, WesQueueError};
use crate::wes::request::{WorkflowRun, infer_workflow_type, params_argument, resolve_params};
use crate::wes::transport::HttpTransport;
use crate::wes::{RunReceipt, RunRequest, RunStatus, WorkflowService, run_summaries};

pub const WES_BASE_PATH: &str = "/ga4gh/wes/v1";

/// Calling convention of the purpose-built WES client.
#[async_trait]
pub trait WesLibrary: Send + Sync {
    async fn get_service_info(&self) -> Result<Value>;

    async fn list_runs(&self, page_size: &str, page_token: &str) -> Result<Value>;

    /// `jsonyaml` is inline JSON text or a locator for a parameter file.
    async fn run(
        &self,
        wf: &str,
        jsonyaml: &str,
        attachments: &[String],
        workflow_type: &str,
        workflow_type_version: &str,
    ) -> Result<Value>;

    async fn cancel(&self, run_id: &str) -> Result<Value>;

    async fn get_run_status(&self, run_id: &str) -> Result<Value>;

    async fn get_run_log(&self, run_id: &str) -> Result<Value>;
}

/// HTTP implementation of [`WesLibrary`] against fixed WES v1 routes.
#[derive(Debug, Clone)]
pub struct HttpWesLibrary {
    transport: HttpTransport,
}

impl HttpWesLibrary {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    pub fn from_endpoint(endpoint: &ServiceEndpoint) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(endpoint)?))
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let path = format!("{WES_BASE_PATH}{path}");
        self.transport
            .send(self.transport.request(Method::GET, &path))
            .await?
            .into_json()
    }
}

#[async_trait]
impl WesLibrary for HttpWesLibrary {
    async fn get_service_info(&self) -> Result<Value> {
        self.get("/service-info").await
    }

    async fn list_runs(&self, page_size: &str, page_token: &str) -> Result<Value> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if !page_size.is_empty() {
            query.push(("page_size", page_size));
        }
        if !page_token.is_empty() {
            query.push(("page_token", page_token));
        }
        let path = format!("{WES_BASE_PATH}/runs");
        self.transport
            .send(self.transport.request(Method::GET, &path).query(&query))
            .await?
            .into_json()
    }

    async fn run(
        &self,
        wf: &str,
        jsonyaml: &str,
        attachments: &[String],
        workflow_type: &str,
        workflow_type_version: &str,
    ) -> Result<Value> {
        let inferred = infer_workflow_type(wf);
        let workflow_type = match (workflow_type, inferred) {
            ("", Some((t, _))) => t.to_string(),
            ("", None) => {
                return Err(WesQueueError::Submission(format!(
                    "cannot determine workflow type for '{wf}'"
                )));
            }
            (given, _) => given.to_string(),
        };
        let workflow_type_version = match (workflow_type_version, inferred) {
            ("", Some((_, v))) => v.to_string(),
            (given, _) => given.to_string(),
        };

        let http = self.transport.client();
        let run = WorkflowRun {
            workflow_url: wf.to_string(),
            workflow_params: resolve_params(http, jsonyaml).await?,
            workflow_type,
            workflow_type_version,
            attachments: attachments.to_vec(),
        };
        let form = run.into_form(http).await?;

        let path = format!("{WES_BASE_PATH}/runs");
        self.transport
            .send(self.transport.request(Method::POST, &path).multipart(form))
            .await?
            .into_submission_json()
    }

    async fn cancel(&self, run_id: &str) -> Result<Value> {
        let path = format!("{WES_BASE_PATH}/runs/{run_id}/cancel");
        self.transport
            .send(self.transport.request(Method::POST, &path))
            .await?
            .into_json()
    }

    async fn get_run_status(&self, run_id: &str) -> Result<Value> {
        self.get(&format!("/runs/{run_id}/status")).await
    }

    async fn get_run_log(&self, run_id: &str) -> Result<Value> {
        self.get(&format!("/runs/{run_id}")).await
    }
}

/// Presents a [`WesLibrary`] as a canonical [`WorkflowService`].
#[derive(Debug, Clone)]
pub struct LibraryAdapter<L: WesLibrary> {
    library: L,
}

impl<L: WesLibrary> LibraryAdapter<L> {
    pub fn new(library: L) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &L {
        &self.library
    }
}

#[async_trait]
impl<L: WesLibrary> WorkflowService for LibraryAdapter<L> {
    async fn get_service_info(&self) -> Result<Value> {
        self.library.get_service_info().await
    }

    async fn list_runs(&self) -> Result<Vec<RunStatus>> {
        run_summaries(self.library.list_runs("", "").await?)
    }

    async fn run_workflow(&self, request: &RunRequest) -> Result<RunReceipt> {
        let jsonyaml = params_argument(&request.workflow_params);
        debug!(workflow = %request.workflow_url, "translating RunWorkflow to library run()");
        let response = self
            .library
            .run(
                &request.workflow_url,
                &jsonyaml,
                &request.attachments,
                request.workflow_type.as_deref().unwrap_or(""),
                request.workflow_type_version.as_deref().unwrap_or(""),
            )
            .await?;
        RunReceipt::from_value(response)
    }

    async fn cancel_run(&self, run_id: &str) -> Result<Value> {
        self.library.cancel(run_id).await
    }

    async fn get_run_status(&self, run_id: &str) -> Result<RunStatus> {
        RunStatus::from_value(self.library.get_run_status(run_id).await?)
    }

    async fn get_run_log(&self, run_id: &str) -> Result<Value> {
        self.library.get_run_log(run_id).await
    }
}
