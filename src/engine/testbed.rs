// src/engine/testbed.rs

//! Interoperability checks across registries and execution services.
//!
//! A workflow published with a checker workflow can be verified on any
//! execution service: the checker gets its own queue whose `target_queue`
//! is the checked workflow's queue, so a completed checker run settles as
//! `VALIDATED` and records a verification for the checked workflow.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{OrchestratorConfig, QueueConfig};
use crate::engine::{Orchestrator, QueueLog};
use crate::errors::{Result, WesQueueError};
use crate::fs::FileSystem;
use crate::registry::WorkflowTest;
use crate::store::QueueId;

/// Appended to a queue id to name the queue its checker runs in.
pub const CHECKER_SUFFIX: &str = "_checker";

/// Reachability of every configured registry and execution service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceReport {
    pub toolregistries: IndexMap<String, bool>,
    pub workflowservices: IndexMap<String, bool>,
}

/// Checked queue id → execution-service id → checker run logs.
pub type CheckLog = IndexMap<QueueId, IndexMap<String, QueueLog>>;

pub fn checker_queue_id(queue_id: &str) -> String {
    format!("{queue_id}{CHECKER_SUFFIX}")
}

/// Every registry-backed queue paired with its allowed services. Checker
/// queues themselves are left out.
pub fn check_matrix(config: &OrchestratorConfig) -> IndexMap<String, Vec<String>> {
    config
        .queues()
        .iter()
        .filter(|(queue_id, queue)| {
            queue.trs_id.is_some()
                && queue.workflow_id.is_some()
                && !queue_id.ends_with(CHECKER_SUFFIX)
        })
        .map(|(queue_id, queue)| (queue_id.clone(), queue.wes_opts.clone()))
        .collect()
}

impl<F: FileSystem> Orchestrator<F> {
    /// Ask every configured tool registry and execution service whether it responds.
    pub async fn poll_services(&mut self) -> Result<ServiceReport> {
        let config = self.config.load()?;
        let mut report = ServiceReport::default();

        for (trs_id, registry) in config.tool_registries() {
            let ok = match self.resolver.service_info(registry).await {
                Ok(_) => true,
                Err(err) => {
                    warn!(trs = %trs_id, error = %err, "registry info request failed");
                    false
                }
            };
            report.toolregistries.insert(trs_id.clone(), ok);
        }

        for wes_id in config.workflow_services().keys() {
            let ok = match self.service(&config, wes_id).await {
                Ok(client) => match client.get_service_info().await {
                    Ok(_) => true,
                    Err(err) => {
                        warn!(wes = %wes_id, error = %err, "service info request failed");
                        false
                    }
                },
                Err(err) => {
                    warn!(wes = %wes_id, error = %err, "could not connect to service");
                    false
                }
            };
            report.workflowservices.insert(wes_id.clone(), ok);
        }

        Ok(report)
    }

    /// Run the checker workflow of `queue_id` on `wes_id`.
    ///
    /// Creates or updates the checker queue, queues one submission per test
    /// parameter file the registry publishes for the checker, then runs the
    /// checker queue.
    pub async fn check_workflow(&mut self, queue_id: &str, wes_id: &str) -> Result<QueueLog> {
        let config = self.config.load()?;
        let queue = config.queue(queue_id)?.clone();
        let (Some(trs_id), Some(workflow_id), Some(version_id)) = (
            queue.trs_id.clone(),
            queue.workflow_id.clone(),
            queue.version_id.clone(),
        ) else {
            return Err(WesQueueError::Config(format!(
                "queue '{queue_id}' needs trs_id, workflow_id and version_id to be checked"
            )));
        };
        config.workflow_service(wes_id)?;
        let registry = config.tool_registry(&trs_id)?.clone();

        let checker_id = self.resolver.checker_id(&registry, &workflow_id).await?;
        let checker_queue = checker_queue_id(queue_id);
        info!(
            queue = %queue_id,
            checker = %checker_id,
            checker_queue = %checker_queue,
            wes = %wes_id,
            "checking workflow"
        );

        let checker = match config.queues().get(&checker_queue) {
            Some(existing) => {
                let mut checker = existing.clone();
                if !checker.allows_service(wes_id) {
                    checker.wes_opts.push(wes_id.to_string());
                }
                checker.wes_default = wes_id.to_string();
                checker
            }
            None => QueueConfig {
                workflow_type: queue.workflow_type.clone(),
                trs_id: Some(trs_id),
                workflow_id: Some(checker_id.clone()),
                version_id: Some(version_id.clone()),
                workflow_url: None,
                workflow_attachments: Vec::new(),
                wes_default: wes_id.to_string(),
                wes_opts: vec![wes_id.to_string()],
                target_queue: Some(queue_id.to_string()),
            },
        };
        self.config.set_queue(&checker_queue, checker)?;

        let tests = self
            .resolver
            .workflow_tests(&registry, &checker_id, &version_id, &queue.workflow_type)
            .await?;
        let payloads: Vec<_> = tests.iter().filter_map(WorkflowTest::payload).collect();
        if payloads.is_empty() {
            return Err(WesQueueError::NotFound(format!(
                "test parameter files for checker '{checker_id}' version '{version_id}'"
            )));
        }
        for payload in payloads {
            self.create_submission(&checker_queue, payload, Some(wes_id))?;
        }

        self.run_queue(&checker_queue, Some(wes_id)).await
    }

    /// `check_workflow` for every (queue, service) pair of `matrix`, in
    /// order. The first failure ends the sweep.
    pub async fn check_all(&mut self, matrix: &IndexMap<String, Vec<String>>) -> Result<CheckLog> {
        let mut log = CheckLog::new();
        for (queue_id, services) in matrix {
            for wes_id in services {
                let queue_log = self.check_workflow(queue_id, wes_id).await?;
                log.entry(queue_id.clone())
                    .or_default()
                    .insert(wes_id.clone(), queue_log);
            }
        }
        Ok(log)
    }
}
