// src/engine/runtime.rs

use std::io::Write;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::engine::snapshot::Snapshot;
use crate::engine::{OrchestratorLog, Orchestrator};
use crate::errors::Result;
use crate::fs::FileSystem;

pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(4);

/// What the monitor loop saw before it was stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub passes: u64,
    pub submissions: usize,
    pub active: usize,
}

impl<F: FileSystem> Orchestrator<F> {
    /// Reconcile every queue, render a snapshot to `out`, then wait for
    /// `interval` or the stop signal, until stopped.
    ///
    /// A queue whose pass fails is logged and left out of that snapshot.
    /// The stop signal is checked before each pass as well, so a signal
    /// sent while a pass is in flight ends the loop right after it.
    pub async fn monitor<W: Write>(
        &mut self,
        interval: Duration,
        mut stop: watch::Receiver<bool>,
        out: &mut W,
    ) -> Result<MonitorSummary> {
        info!(interval = ?interval, "monitor started");
        let mut summary = MonitorSummary::default();

        loop {
            if *stop.borrow() {
                break;
            }

            let log = self.monitor_pass().await?;
            let snapshot = Snapshot::from_log(&log);
            summary.passes += 1;
            summary.submissions = snapshot.rows().len();
            summary.active = snapshot.active();

            write!(out, "{snapshot}")?;
            if summary.active == 0 {
                writeln!(out, "No jobs running...")?;
            }
            writeln!(out, "\n(Press CTRL+C to quit)")?;
            out.flush()?;
            debug!(pass = summary.passes, active = summary.active, "monitor pass rendered");

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = stop.changed() => {
                    // A dropped sender can never signal again; treat it as stop.
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        writeln!(
            out,
            "Done: {} pass(es), {} submission(s), {} still running.",
            summary.passes, summary.submissions, summary.active
        )?;
        info!(passes = summary.passes, "monitor stopped");
        Ok(summary)
    }

    async fn monitor_pass(&mut self) -> Result<OrchestratorLog> {
        let config = self.config.load()?;
        let mut log = OrchestratorLog::new();

        for queue_id in config.queue_ids() {
            match self.monitor_queue(queue_id).await {
                Ok(queue_log) => {
                    log.insert(queue_id.to_string(), queue_log);
                }
                Err(err) => {
                    warn!(queue = %queue_id, error = %err, "monitoring queue failed; skipping");
                }
            }
        }

        Ok(log)
    }
}
