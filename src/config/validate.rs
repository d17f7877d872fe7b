// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use url::Url;

use crate::config::model::{OrchestratorConfig, RawOrchestratorConfig};
use crate::errors::{Result, WesQueueError};

impl TryFrom<RawOrchestratorConfig> for OrchestratorConfig {
    type Error = crate::errors::WesQueueError;

    fn try_from(raw: RawOrchestratorConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(OrchestratorConfig::new_unchecked(raw))
    }
}

/// Run every config check, returning the first violation.
pub fn validate_config(cfg: &RawOrchestratorConfig) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawOrchestratorConfig) -> Result<()> {
    validate_endpoints(cfg)?;
    validate_workflow_sources(cfg)?;
    validate_service_options(cfg)?;
    validate_target_queues(cfg)?;
    validate_downstream_chain(cfg)?;
    Ok(())
}

fn validate_endpoints(cfg: &RawOrchestratorConfig) -> Result<()> {
    let all = cfg
        .workflowservices
        .iter()
        .map(|(id, ep)| ("workflow service", id, ep))
        .chain(
            cfg.toolregistries
                .iter()
                .map(|(id, ep)| ("tool registry", id, ep)),
        );

    for (kind, id, endpoint) in all {
        if endpoint.host.trim().is_empty() {
            return Err(WesQueueError::Config(format!(
                "{kind} '{id}' has an empty host"
            )));
        }
        if endpoint.host.contains("://") {
            return Err(WesQueueError::Config(format!(
                "{kind} '{id}' host must not include a scheme (got '{}'); use `proto`",
                endpoint.host
            )));
        }
        let parsed = Url::parse(&endpoint.base_url()).map_err(|e| {
            WesQueueError::Config(format!(
                "{kind} '{id}' host '{}' is not a valid address: {e}",
                endpoint.host
            ))
        })?;
        if parsed.path() != "/" {
            return Err(WesQueueError::Config(format!(
                "{kind} '{id}' host must be `host[:port]` without a path (got '{}')",
                endpoint.host
            )));
        }
    }
    Ok(())
}

fn validate_workflow_sources(cfg: &RawOrchestratorConfig) -> Result<()> {
    for (queue_id, queue) in cfg.queues.iter() {
        if queue.workflow_url.is_some() {
            continue;
        }

        if queue.workflow_id.is_none() {
            return Err(WesQueueError::Config(format!(
                "queue '{queue_id}' needs either `workflow_url` or `workflow_id`"
            )));
        }

        match queue.trs_id.as_deref() {
            Some(trs_id) if cfg.toolregistries.contains_key(trs_id) => {}
            Some(trs_id) => {
                return Err(WesQueueError::Config(format!(
                    "queue '{queue_id}' references unknown tool registry '{trs_id}'"
                )));
            }
            None => {
                return Err(WesQueueError::Config(format!(
                    "queue '{queue_id}' has no `workflow_url` and no `trs_id` to resolve it from"
                )));
            }
        }
    }
    Ok(())
}

fn validate_service_options(cfg: &RawOrchestratorConfig) -> Result<()> {
    for (queue_id, queue) in cfg.queues.iter() {
        if !queue.allows_service(&queue.wes_default) {
            return Err(WesQueueError::Config(format!(
                "queue '{queue_id}': wes_default '{}' is not listed in wes_opts",
                queue.wes_default
            )));
        }

        for wes_id in queue.wes_opts.iter() {
            if !cfg.workflowservices.contains_key(wes_id) {
                return Err(WesQueueError::Config(format!(
                    "queue '{queue_id}' has unknown workflow service '{wes_id}' in wes_opts"
                )));
            }
        }
    }
    Ok(())
}

fn validate_target_queues(cfg: &RawOrchestratorConfig) -> Result<()> {
    for (queue_id, queue) in cfg.queues.iter() {
        let Some(target) = queue.target_queue.as_deref() else {
            continue;
        };
        if target == queue_id {
            return Err(WesQueueError::Config(format!(
                "queue '{queue_id}' cannot target itself"
            )));
        }
        if !cfg.queues.contains_key(target) {
            return Err(WesQueueError::Config(format!(
                "queue '{queue_id}' has unknown target_queue '{target}'"
            )));
        }
    }
    Ok(())
}

fn validate_downstream_chain(cfg: &RawOrchestratorConfig) -> Result<()> {
    // Edge direction: queue -> target_queue.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.queues.keys() {
        graph.add_node(name.as_str());
    }

    for (name, queue) in cfg.queues.iter() {
        if let Some(target) = queue.target_queue.as_deref() {
            graph.add_edge(name.as_str(), target, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(WesQueueError::Config(format!(
            "cycle detected in target_queue chain involving queue '{}'",
            cycle.node_id()
        ))),
    }
}
