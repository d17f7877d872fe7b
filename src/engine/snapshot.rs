// src/engine/snapshot.rs

use std::fmt;

use crate::engine::OrchestratorLog;
use crate::types::RunState;

/// One row of the monitor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub queue_id: String,
    pub submission_id: String,
    pub wes_id: String,
    pub run_id: String,
    pub state: RunState,
    pub elapsed_time: Option<u64>,
}

/// Flattened view of every run log gathered in one monitor pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    rows: Vec<SnapshotRow>,
}

impl Snapshot {
    pub fn from_log(log: &OrchestratorLog) -> Self {
        let rows = log
            .iter()
            .flat_map(|(queue_id, queue_log)| {
                queue_log.iter().map(move |(submission_id, run_log)| SnapshotRow {
                    queue_id: queue_id.clone(),
                    submission_id: submission_id.clone(),
                    wes_id: run_log.wes_id.clone().unwrap_or_default(),
                    run_id: run_log.run_id.clone(),
                    state: run_log.state,
                    elapsed_time: run_log.elapsed_time,
                })
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[SnapshotRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose remote run has not reached a terminal state.
    pub fn active(&self) -> usize {
        self.rows.iter().filter(|row| !row.state.is_terminal()).count()
    }
}

const HEADERS: [&str; 6] = ["queue", "submission", "wes", "run_id", "state", "elapsed"];

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<[String; 6]> = self
            .rows
            .iter()
            .map(|row| {
                [
                    row.queue_id.clone(),
                    row.submission_id.clone(),
                    row.wes_id.clone(),
                    row.run_id.clone(),
                    row.state.to_string(),
                    row.elapsed_time.map(format_elapsed).unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();

        let mut widths = HEADERS.map(str::len);
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.len());
            }
        }

        write_row(f, &HEADERS.map(str::to_string), &widths)?;
        for row in &cells {
            write_row(f, row, &widths)?;
        }
        Ok(())
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, row: &[String; 6], widths: &[usize; 6]) -> fmt::Result {
    let line = row
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(f, "{}", line.trim_end())
}

/// `h:mm:ss`.
pub fn format_elapsed(seconds: u64) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
