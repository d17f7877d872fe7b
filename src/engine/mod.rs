// src/engine/mod.rs

//! Orchestration engine for wesqueue.
//!
//! The pure reconciliation rules live in [`core`]; [`orchestrator`] is the
//! IO shell that applies them against the store and the execution services,
//! [`runtime`] drives the cancellable monitor loop on top of it, and
//! [`testbed`] runs registry checker workflows across services.

use indexmap::IndexMap;

use crate::store::{QueueId, RunLog, SubmissionId};

pub mod clock;
pub mod core;
pub mod orchestrator;
pub mod runtime;
pub mod snapshot;
pub mod testbed;

/// Submission id → run log for one queue.
pub type QueueLog = IndexMap<SubmissionId, RunLog>;

/// Queue id → per-queue run logs.
pub type OrchestratorLog = IndexMap<QueueId, QueueLog>;

pub use clock::{Clock, SystemClock};
pub use orchestrator::Orchestrator;
pub use runtime::{DEFAULT_MONITOR_INTERVAL, MonitorSummary};
pub use snapshot::{Snapshot, SnapshotRow};
pub use testbed::{CheckLog, ServiceReport, check_matrix, checker_queue_id};
