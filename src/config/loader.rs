// src/config/loader.rs

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{
    OrchestratorConfig, QueueConfig, RawOrchestratorConfig, ServiceEndpoint,
};
use crate::errors::{Result, WesQueueError};
use crate::fs::FileSystem;
use crate::types::Proto;

pub const DEFAULT_CONFIG_FILE: &str = "wesqueue.toml";

/// Parse TOML into a `RawOrchestratorConfig`.
///
/// This only performs deserialization; use `OrchestratorConfig::try_from`
/// for the cross-reference checks.
pub fn load_from_str(contents: &str) -> Result<RawOrchestratorConfig> {
    let config: RawOrchestratorConfig = toml::from_str(contents)?;
    Ok(config)
}

/// Read and validate a config file straight from disk.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<OrchestratorConfig> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    OrchestratorConfig::try_from(load_from_str(&contents)?)
}

/// Helper to resolve a default config path.
///
/// Respects `WESQUEUE_CONFIG`, falling back to `wesqueue.toml` in the
/// current working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os("WESQUEUE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Config written on first use: two local test queues, one public tool
/// registry and one local execution service.
pub fn default_config() -> RawOrchestratorConfig {
    let mut cfg = RawOrchestratorConfig::default();

    let mut cwl = QueueConfig::with_url("CWL", "file://tests/testdata/md5sum.cwl", "local");
    cwl.workflow_attachments = vec![
        "file://tests/testdata/md5sum.input".to_string(),
        "file://tests/testdata/dockstore-tool-md5sum.cwl".to_string(),
    ];
    cfg.queues.insert("test_cwl_queue".to_string(), cwl);

    let mut wdl = QueueConfig::with_url("WDL", "file://tests/testdata/md5sum.wdl", "local");
    wdl.workflow_attachments = vec!["file://tests/testdata/md5sum.input".to_string()];
    cfg.queues.insert("test_wdl_queue".to_string(), wdl);

    cfg.toolregistries.insert(
        "dockstore".to_string(),
        ServiceEndpoint::new("dockstore.org:8443", Proto::Https),
    );
    cfg.workflowservices.insert(
        "local".to_string(),
        ServiceEndpoint::new("0.0.0.0:8080", Proto::Http),
    );

    cfg
}

/// Read/modify/write access to the orchestrator config document.
///
/// The document is re-read on every call so edits made by other tools
/// between orchestrator passes are picked up.
#[derive(Debug, Clone)]
pub struct ConfigStore<F: FileSystem> {
    fs: F,
    path: PathBuf,
}

impl<F: FileSystem> ConfigStore<F> {
    pub fn new(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the default config if no file exists yet.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.fs.exists(&self.path) {
            return Ok(());
        }
        info!(path = ?self.path, "no config found; writing default config");
        self.save_raw(default_config())
    }

    pub fn load_raw(&self) -> Result<RawOrchestratorConfig> {
        self.ensure_exists()?;
        let contents = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| WesQueueError::Config(format!("reading {:?}: {e:#}", self.path)))?;
        load_from_str(&contents)
    }

    pub fn load(&self) -> Result<OrchestratorConfig> {
        OrchestratorConfig::try_from(self.load_raw()?)
    }

    /// Validate and persist a whole config document.
    pub fn save_raw(&self, raw: RawOrchestratorConfig) -> Result<()> {
        let checked = OrchestratorConfig::try_from(raw)?;
        self.save(&checked)
    }

    pub fn save(&self, config: &OrchestratorConfig) -> Result<()> {
        let text = toml::to_string_pretty(config.as_raw())
            .map_err(|e| WesQueueError::Config(format!("serializing config: {e}")))?;
        self.fs.write(&self.path, text.as_bytes())?;
        debug!(path = ?self.path, "config saved");
        Ok(())
    }

    /// Replace one queue's section.
    pub fn set_queue(&self, queue_id: &str, queue: QueueConfig) -> Result<()> {
        let mut raw = self.load_raw()?;
        raw.queues.insert(queue_id.to_string(), queue);
        self.save_raw(raw)
    }

    /// Register a queue. `wes_opts` defaults to `[wes_default]` when empty.
    pub fn add_queue(&self, queue_id: &str, mut queue: QueueConfig) -> Result<()> {
        if queue.workflow_id.is_none() && queue.workflow_url.is_none() {
            return Err(WesQueueError::Config(
                "one of either `workflow_id` or `workflow_url` must be specified".to_string(),
            ));
        }
        if queue.wes_opts.is_empty() {
            queue.wes_opts.push(queue.wes_default.clone());
        }
        info!(queue = %queue_id, "registering queue");
        self.set_queue(queue_id, queue)
    }

    pub fn add_tool_registry(&self, trs_id: &str, endpoint: ServiceEndpoint) -> Result<()> {
        let mut raw = self.load_raw()?;
        raw.toolregistries.insert(trs_id.to_string(), endpoint);
        info!(trs = %trs_id, "registering tool registry");
        self.save_raw(raw)
    }

    pub fn add_workflow_service(&self, wes_id: &str, endpoint: ServiceEndpoint) -> Result<()> {
        let mut raw = self.load_raw()?;
        raw.workflowservices.insert(wes_id.to_string(), endpoint);
        info!(wes = %wes_id, "registering workflow service");
        self.save_raw(raw)
    }

    /// Allow `wes_id` for each of `queue_ids`, optionally making it the default.
    pub fn add_wes_opt(&self, queue_ids: &[String], wes_id: &str, make_default: bool) -> Result<()> {
        let mut raw = self.load_raw()?;
        for queue_id in queue_ids {
            let queue = raw
                .queues
                .get_mut(queue_id)
                .ok_or_else(|| WesQueueError::NotFound(format!("queue '{queue_id}'")))?;
            if !queue.allows_service(wes_id) {
                queue.wes_opts.push(wes_id.to_string());
            }
            if make_default {
                queue.wes_default = wes_id.to_string();
            }
        }
        self.save_raw(raw)
    }

    /// Human-readable summary of queues, registries and services.
    pub fn show(&self) -> Result<String> {
        let cfg = self.load()?;
        Ok(render_config(&cfg))
    }
}

const RULE: &str =
    "---------------------------------------------------------------------------";

fn render_config(cfg: &OrchestratorConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Orchestrator options:\n");

    let _ = writeln!(out, "Workflow Evaluation Queues");
    let _ = writeln!(out, "(queue ID: workflow ID [version])");
    let _ = writeln!(out, "{RULE}");
    for (queue_id, queue) in cfg.queues() {
        let _ = writeln!(
            out,
            "{queue_id}: {} ({})",
            queue.workflow_id.as_deref().unwrap_or("-"),
            queue.version_id.as_deref().unwrap_or("-"),
        );
        let _ = writeln!(
            out,
            "  > workflow URL: {}",
            queue.workflow_url.as_deref().unwrap_or("(unresolved)")
        );
        if queue.workflow_attachments.is_empty() {
            let _ = writeln!(out, "  > workflow attachments: none");
        } else {
            let _ = writeln!(out, "  > workflow attachments:");
            for attachment in &queue.workflow_attachments {
                let _ = writeln!(out, "    - {attachment}");
            }
        }
        let _ = writeln!(out, "  > workflow type: {}", queue.workflow_type);
        let _ = writeln!(
            out,
            "  > from TRS: {}",
            queue.trs_id.as_deref().unwrap_or("-")
        );
        let _ = writeln!(out, "  > WES options: {:?}", queue.wes_opts);
        if let Some(target) = &queue.target_queue {
            let _ = writeln!(out, "  > target queue: {target}");
        }
    }

    let _ = writeln!(out, "\nTool Registries");
    let _ = writeln!(out, "(TRS ID: host address)");
    let _ = writeln!(out, "{RULE}");
    for (trs_id, endpoint) in cfg.tool_registries() {
        let _ = writeln!(out, "{trs_id}: {}", endpoint.host);
    }

    let _ = writeln!(out, "\nWorkflow Services");
    let _ = writeln!(out, "(WES ID: host address)");
    let _ = writeln!(out, "{RULE}");
    for (wes_id, endpoint) in cfg.workflow_services() {
        let _ = writeln!(out, "{wes_id}: {}", endpoint.host);
    }

    out
}
