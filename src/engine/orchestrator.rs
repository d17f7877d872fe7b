// src/engine/orchestrator.rs

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ConfigStore, OrchestratorConfig, QueueConfig};
use crate::engine::clock::{Clock, SystemClock};
use crate::engine::core::{merge_attachments, reconcile_run_log, settled_status};
use crate::engine::{OrchestratorLog, QueueLog};
use crate::errors::{Result, WesQueueError};
use crate::fs::FileSystem;
use crate::notify::DownstreamNotifier;
use crate::registry::{TrsClient, WorkflowResolver};
use crate::store::{
    RunLog, StatusFilter, Submission, SubmissionField, SubmissionId, SubmissionStore,
};
use crate::types::{RunState, SubmissionStatus};
use crate::wes::{RunRequest, ServiceConnector, ServicePool, WorkflowService};

/// Drives submissions through their lifecycle and reconciles them with the
/// execution services.
///
/// All work is sequential: each remote call is awaited before the next
/// starts. The orchestrator is the single owner of its submission store.
pub struct Orchestrator<F: FileSystem> {
    pub(crate) config: ConfigStore<F>,
    pub(crate) store: SubmissionStore<F>,
    services: ServicePool,
    pub(super) resolver: Box<dyn WorkflowResolver>,
    notifier: Box<dyn DownstreamNotifier>,
    clock: Box<dyn Clock>,
}

impl<F: FileSystem> fmt::Debug for Orchestrator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config.path())
            .field("store", &self.store.path())
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

impl<F: FileSystem> Orchestrator<F> {
    pub fn new(
        config: ConfigStore<F>,
        store: SubmissionStore<F>,
        connector: impl ServiceConnector + 'static,
        notifier: impl DownstreamNotifier + 'static,
    ) -> Self {
        Self {
            config,
            store,
            services: ServicePool::new(connector),
            resolver: Box::new(TrsClient::new()),
            notifier: Box::new(notifier),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_resolver(mut self, resolver: impl WorkflowResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &ConfigStore<F> {
        &self.config
    }

    pub fn store(&self) -> &SubmissionStore<F> {
        &self.store
    }

    /// Queue a submission without running it.
    ///
    /// An explicit `wes_id` must be one of the queue's `wes_opts`.
    pub fn create_submission(
        &mut self,
        queue_id: &str,
        data: Value,
        wes_id: Option<&str>,
    ) -> Result<SubmissionId> {
        let config = self.config.load()?;
        let queue = config.queue(queue_id)?;
        if let Some(wes_id) = wes_id {
            ensure_allowed(queue, queue_id, wes_id)?;
        }
        self.store
            .create_at(queue_id, data, wes_id.map(str::to_string), self.clock.now())
    }

    /// Submit `payload` to the queue's workflow and return the run log.
    ///
    /// Unless `resubmission` is set, a new submission record is created up
    /// front and marked `SUBMITTED` once the run is accepted. Resubmissions
    /// replay an existing record and leave persistence to the caller.
    ///
    /// Resolution, connection and submission errors propagate. The status
    /// poll right after an accepted run is the exception: its failure is
    /// logged and the run recorded as `UNKNOWN`, since the run exists
    /// remotely and the next monitor pass will catch up.
    pub async fn run_job(
        &mut self,
        queue_id: &str,
        wes_id: Option<&str>,
        payload: Value,
        extra_attachments: &[String],
        resubmission: bool,
    ) -> Result<RunLog> {
        let queue = self.resolved_queue(queue_id).await?;
        let config = self.config.load()?;
        let wes_id = wes_id.unwrap_or(&queue.wes_default).to_string();
        ensure_allowed(&queue, queue_id, &wes_id)?;

        let submission_id = if resubmission {
            None
        } else {
            Some(
                self.store.create_at(
                    queue_id,
                    payload.clone(),
                    Some(wes_id.clone()),
                    self.clock.now(),
                )?,
            )
        };

        let client = self.service(&config, &wes_id).await?;
        let request = RunRequest {
            workflow_url: queue.workflow_url.clone().unwrap_or_default(),
            workflow_params: payload,
            attachments: merge_attachments(&queue.workflow_attachments, extra_attachments),
            workflow_type: Some(queue.workflow_type.clone()),
            workflow_type_version: None,
        };

        info!(
            queue = %queue_id,
            wes = %wes_id,
            workflow = %request.workflow_url,
            attachments = request.attachments.len(),
            "submitting workflow run"
        );
        let receipt = client.run_workflow(&request).await?;
        let start_time = self.clock.now();

        // The run is accepted at this point; losing its id to a failed
        // status call would orphan it, so record UNKNOWN and let the next
        // monitor pass catch up.
        let state = match client.get_run_status(&receipt.run_id).await {
            Ok(status) => status.state,
            Err(err) => {
                warn!(
                    wes = %wes_id,
                    run_id = %receipt.run_id,
                    error = %err,
                    "initial status poll failed"
                );
                RunState::Unknown
            }
        };

        let run_log = RunLog {
            run_id: receipt.run_id,
            state,
            start_time,
            elapsed_time: None,
            wes_id: Some(wes_id),
        };
        info!(queue = %queue_id, run_id = %run_log.run_id, state = %state, "run accepted");

        if let Some(submission_id) = submission_id {
            self.mark_submitted(queue_id, &submission_id, &run_log)?;
        }

        Ok(run_log)
    }

    /// Run one stored submission.
    ///
    /// The submission's bound service wins over `wes_id`; with neither, the
    /// queue default is used and becomes the binding.
    pub async fn run_submission(
        &mut self,
        queue_id: &str,
        submission_id: &str,
        wes_id: Option<&str>,
    ) -> Result<RunLog> {
        let submission = self.store.get(queue_id, submission_id)?;
        if !submission
            .status
            .can_transition_to(SubmissionStatus::Submitted)
        {
            return Err(WesQueueError::InvalidTransition {
                from: submission.status,
                to: SubmissionStatus::Submitted,
            });
        }

        let wes_id = submission.wes_id.as_deref().or(wes_id);
        info!(
            queue = %queue_id,
            submission = %submission_id,
            wes = ?wes_id,
            "running submission"
        );
        debug!(submission = %submission_id, data = %submission.data, "job parameters");

        let run_log = self
            .run_job(queue_id, wes_id, submission.data.clone(), &[], true)
            .await?;

        if submission.wes_id.is_none() {
            self.store.update(
                queue_id,
                submission_id,
                SubmissionField::WesId(run_log.wes_id.clone()),
            )?;
        }
        self.mark_submitted(queue_id, submission_id, &run_log)?;
        Ok(run_log)
    }

    /// Run every `RECEIVED` submission of a queue, one at a time, in
    /// creation order.
    pub async fn run_queue(&mut self, queue_id: &str, wes_id: Option<&str>) -> Result<QueueLog> {
        let mut queue_log = QueueLog::new();
        let received = self
            .store
            .list(queue_id, &StatusFilter::only(SubmissionStatus::Received))?;

        for submission_id in received {
            let run_log = self.run_submission(queue_id, &submission_id, wes_id).await?;
            queue_log.insert(submission_id, run_log);
        }

        Ok(queue_log)
    }

    /// `run_queue` for every configured queue.
    pub async fn run_all(&mut self) -> Result<OrchestratorLog> {
        let config = self.config.load()?;
        let mut orchestrator_log = OrchestratorLog::new();
        for queue_id in config.queue_ids() {
            let queue_log = self.run_queue(queue_id, None).await?;
            orchestrator_log.insert(queue_id.to_string(), queue_log);
        }
        Ok(orchestrator_log)
    }

    /// Reconcile every submitted submission of a queue with its service.
    ///
    /// Terminal submissions are reported but not polled. A remote failure
    /// for one submission is logged and that submission keeps its previous
    /// run log until the next pass; store failures abort the pass.
    pub async fn monitor_queue(&mut self, queue_id: &str) -> Result<QueueLog> {
        let config = self.config.load()?;
        let queue = config.queue(queue_id)?.clone();
        let mut queue_log = QueueLog::new();

        let ids = self.store.list(
            queue_id,
            &StatusFilter::all().excluding(SubmissionStatus::Received),
        )?;

        for submission_id in ids {
            let submission = self.store.get(queue_id, &submission_id)?;
            let Some(run_log) = submission.run_log.clone() else {
                warn!(
                    queue = %queue_id,
                    submission = %submission_id,
                    status = %submission.status,
                    "submission has no run log; skipping"
                );
                continue;
            };

            if submission.status.is_terminal() {
                queue_log.insert(submission_id, run_log.with_wes_id(submission.wes_id));
                continue;
            }

            match self
                .reconcile_submission(&config, &queue, queue_id, &submission_id, &submission, &run_log)
                .await
            {
                Ok(updated) => {
                    queue_log.insert(submission_id, updated);
                }
                Err(err @ WesQueueError::StoreCorruption(_)) => return Err(err),
                Err(err) => {
                    warn!(
                        queue = %queue_id,
                        submission = %submission_id,
                        error = %err,
                        "status update failed; will retry next pass"
                    );
                    queue_log.insert(submission_id, run_log.with_wes_id(submission.wes_id));
                }
            }
        }

        Ok(queue_log)
    }

    /// Ask the submission's service to cancel its run.
    ///
    /// The local status is not touched here; the next monitor pass observes
    /// the remote `CANCELED` state and settles the submission.
    pub async fn cancel_submission(&mut self, queue_id: &str, submission_id: &str) -> Result<Value> {
        let submission = self.store.get(queue_id, submission_id)?;
        if submission.status.is_terminal() {
            return Err(WesQueueError::InvalidTransition {
                from: submission.status,
                to: SubmissionStatus::Canceled,
            });
        }
        let run_log = submission.run_log.clone().ok_or_else(|| {
            WesQueueError::NotFound(format!(
                "run for submission '{submission_id}' (not submitted yet)"
            ))
        })?;

        let config = self.config.load()?;
        let wes_id = bound_service(&submission, &run_log, config.queue(queue_id)?);
        let client = self.service(&config, &wes_id).await?;

        info!(queue = %queue_id, submission = %submission_id, run_id = %run_log.run_id, "requesting cancellation");
        client.cancel_run(&run_log.run_id).await
    }

    async fn reconcile_submission(
        &mut self,
        config: &OrchestratorConfig,
        queue: &QueueConfig,
        queue_id: &str,
        submission_id: &str,
        submission: &Submission,
        run_log: &RunLog,
    ) -> Result<RunLog> {
        let wes_id = bound_service(submission, run_log, queue);
        let client = self.service(config, &wes_id).await?;
        let status = client.get_run_status(&run_log.run_id).await?;

        let updated = reconcile_run_log(run_log, status.state, &wes_id, self.clock.now());
        self.store.update(
            queue_id,
            submission_id,
            SubmissionField::RunLog(updated.clone()),
        )?;
        debug!(
            queue = %queue_id,
            submission = %submission_id,
            state = %updated.state,
            elapsed = ?updated.elapsed_time,
            "run log updated"
        );

        if let Some(next) = settled_status(status.state, queue.target_queue.is_some()) {
            if next == SubmissionStatus::Validated {
                if let Some(target) = queue.target_queue.as_deref() {
                    // Whatever the notifier reports stays scoped to this
                    // submission; only the store's own corruption ends a pass.
                    self.notifier
                        .notify(target, &wes_id)
                        .await
                        .map_err(|err| match err {
                            err @ WesQueueError::Notification(_) => err,
                            other => WesQueueError::Notification(format!(
                                "target queue '{target}': {other}"
                            )),
                        })?;
                }
            }
            self.store
                .update(queue_id, submission_id, SubmissionField::Status(next))?;
            info!(
                queue = %queue_id,
                submission = %submission_id,
                status = %next,
                elapsed = ?updated.elapsed_time,
                "submission settled"
            );
        }

        Ok(updated)
    }

    fn mark_submitted(&mut self, queue_id: &str, submission_id: &str, run_log: &RunLog) -> Result<()> {
        self.store.update(
            queue_id,
            submission_id,
            SubmissionField::RunLog(run_log.clone()),
        )?;
        self.store.update(
            queue_id,
            submission_id,
            SubmissionField::Status(SubmissionStatus::Submitted),
        )
    }

    /// The queue config, resolving and persisting its workflow locator
    /// through the tool registry first if needed.
    async fn resolved_queue(&mut self, queue_id: &str) -> Result<QueueConfig> {
        let config = self.config.load()?;
        let mut queue = config.queue(queue_id)?.clone();
        if queue.is_resolved() {
            return Ok(queue);
        }

        let trs_id = queue.trs_id.as_deref().ok_or_else(|| {
            WesQueueError::Config(format!("queue '{queue_id}' has no trs_id to resolve from"))
        })?;
        let registry = config.tool_registry(trs_id)?;
        let resolved = self.resolver.resolve(queue_id, &queue, registry).await?;

        info!(
            queue = %queue_id,
            workflow_url = %resolved.workflow_url,
            attachments = resolved.attachments.len(),
            "workflow resolved from registry"
        );
        queue.workflow_url = Some(resolved.workflow_url);
        queue.workflow_attachments = resolved.attachments;
        self.config.set_queue(queue_id, queue.clone())?;
        Ok(queue)
    }

    pub(super) async fn service(
        &mut self,
        config: &OrchestratorConfig,
        wes_id: &str,
    ) -> Result<Arc<dyn WorkflowService>> {
        let endpoint = config.workflow_service(wes_id)?;
        self.services.get(wes_id, endpoint).await
    }
}

fn ensure_allowed(queue: &QueueConfig, queue_id: &str, wes_id: &str) -> Result<()> {
    if queue.allows_service(wes_id) {
        return Ok(());
    }
    Err(WesQueueError::Config(format!(
        "workflow service '{wes_id}' is not an option for queue '{queue_id}' (allowed: {:?})",
        queue.wes_opts
    )))
}

/// Service a submission is bound to: its own binding, then the one recorded
/// in its run log, then the queue default.
fn bound_service(submission: &Submission, run_log: &RunLog, queue: &QueueConfig) -> String {
    submission
        .wes_id
        .clone()
        .or_else(|| run_log.wes_id.clone())
        .unwrap_or_else(|| queue.wes_default.clone())
}
