// src/store/mod.rs

//! Submission store: the persisted queue → submission → record document.
//!
//! - [`submissions`] owns the document and its create/list/get/update
//!   operations.
//! - [`ids`] generates collision-checked submission identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{RunState, SubmissionStatus};

pub mod ids;
pub mod submissions;

pub use ids::next_submission_id;
pub use submissions::{DEFAULT_STORE_FILE, SubmissionStore};

pub type QueueId = String;
pub type SubmissionId = String;

/// Execution state of a submission's remote run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub run_id: String,

    /// Last state reported by the execution service.
    #[serde(default, alias = "status")]
    pub state: RunState,

    pub start_time: DateTime<Utc>,

    /// Whole seconds; absent until the first reconciliation pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wes_id: Option<String>,
}

impl RunLog {
    pub fn with_wes_id(mut self, wes_id: Option<String>) -> Self {
        self.wes_id = wes_id;
        self
    }
}

/// One request to run a queue's workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub status: SubmissionStatus,

    /// Input parameterization; opaque to the store.
    #[serde(default)]
    pub data: Value,

    #[serde(default)]
    pub wes_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_log: Option<RunLog>,
}

impl Submission {
    pub fn received(data: Value, wes_id: Option<String>) -> Self {
        Self {
            status: SubmissionStatus::Received,
            data,
            wes_id,
            run_log: None,
        }
    }
}

/// A single field write for [`SubmissionStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionField {
    Status(SubmissionStatus),
    RunLog(RunLog),
    WesId(Option<String>),
    Data(Value),
}

impl SubmissionField {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionField::Status(_) => "status",
            SubmissionField::RunLog(_) => "run_log",
            SubmissionField::WesId(_) => "wes_id",
            SubmissionField::Data(_) => "data",
        }
    }
}

/// Status filter for listing submissions.
///
/// The effective set is `include` minus `exclude`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFilter {
    pub include: Vec<SubmissionStatus>,
    pub exclude: Vec<SubmissionStatus>,
}

impl Default for StatusFilter {
    /// `RECEIVED`, `SUBMITTED`, `VALIDATED` and `COMPLETE`.
    fn default() -> Self {
        Self {
            include: vec![
                SubmissionStatus::Received,
                SubmissionStatus::Submitted,
                SubmissionStatus::Validated,
                SubmissionStatus::Complete,
            ],
            exclude: Vec::new(),
        }
    }
}

impl StatusFilter {
    pub fn all() -> Self {
        Self {
            include: SubmissionStatus::ALL.to_vec(),
            exclude: Vec::new(),
        }
    }

    pub fn only(status: SubmissionStatus) -> Self {
        Self {
            include: vec![status],
            exclude: Vec::new(),
        }
    }

    pub fn excluding(mut self, status: SubmissionStatus) -> Self {
        self.exclude.push(status);
        self
    }

    pub fn matches(&self, status: SubmissionStatus) -> bool {
        self.include.contains(&status) && !self.exclude.contains(&status)
    }
}
