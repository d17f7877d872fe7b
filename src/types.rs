// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Local lifecycle status of a submission.
///
/// Allowed edges:
///
/// ```text
/// RECEIVED  -> SUBMITTED
/// SUBMITTED -> SUBMITTED | COMPLETE | VALIDATED | CANCELED | EXECUTOR_ERROR
/// ```
///
/// Writing the status a submission already has is always accepted, so
/// updates stay idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Received,
    Submitted,
    Complete,
    Canceled,
    ExecutorError,
    Validated,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 6] = [
        SubmissionStatus::Received,
        SubmissionStatus::Submitted,
        SubmissionStatus::Complete,
        SubmissionStatus::Canceled,
        SubmissionStatus::ExecutorError,
        SubmissionStatus::Validated,
    ];

    /// No polling transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SubmissionStatus::Complete
                | SubmissionStatus::Canceled
                | SubmissionStatus::ExecutorError
                | SubmissionStatus::Validated
        )
    }

    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            SubmissionStatus::Received => next == SubmissionStatus::Submitted,
            SubmissionStatus::Submitted => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Received => "RECEIVED",
            SubmissionStatus::Submitted => "SUBMITTED",
            SubmissionStatus::Complete => "COMPLETE",
            SubmissionStatus::Canceled => "CANCELED",
            SubmissionStatus::ExecutorError => "EXECUTOR_ERROR",
            SubmissionStatus::Validated => "VALIDATED",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        SubmissionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| format!("invalid submission status: {s}"))
    }
}

/// State of a run as reported by a remote execution service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Queued,
    Initializing,
    Running,
    Paused,
    Complete,
    ExecutorError,
    SystemError,
    Canceled,
    Canceling,
    /// Anything the service reports that is not in the list above.
    #[default]
    #[serde(other)]
    Unknown,
}

impl RunState {
    /// States during which elapsed time keeps growing.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RunState::Queued | RunState::Initializing | RunState::Running
        )
    }

    /// Remote states that end local polling.
    pub fn is_terminal(self) -> bool {
        self.terminal_status().is_some()
    }

    /// The local status a terminal remote state maps to, before any
    /// downstream validation is applied.
    pub fn terminal_status(self) -> Option<SubmissionStatus> {
        match self {
            RunState::Complete => Some(SubmissionStatus::Complete),
            RunState::Canceled => Some(SubmissionStatus::Canceled),
            RunState::ExecutorError => Some(SubmissionStatus::ExecutorError),
            _ => None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Unknown => "UNKNOWN",
            RunState::Queued => "QUEUED",
            RunState::Initializing => "INITIALIZING",
            RunState::Running => "RUNNING",
            RunState::Paused => "PAUSED",
            RunState::Complete => "COMPLETE",
            RunState::ExecutorError => "EXECUTOR_ERROR",
            RunState::SystemError => "SYSTEM_ERROR",
            RunState::Canceled => "CANCELED",
            RunState::Canceling => "CANCELING",
        };
        f.pad(s)
    }
}

/// Which client strategy backs an execution-service endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    /// Generic client built from the endpoint's API description.
    #[default]
    Contract,
    /// Purpose-built WES client library behind a translation layer.
    Library,
}

impl FromStr for ClientKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contract" => Ok(ClientKind::Contract),
            "library" => Ok(ClientKind::Library),
            other => Err(format!(
                "invalid client kind: {other} (expected \"contract\" or \"library\")"
            )),
        }
    }
}

/// URL scheme used to reach a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Proto {
    Http,
    #[default]
    Https,
}

impl Proto {
    pub fn as_str(self) -> &'static str {
        match self {
            Proto::Http => "http",
            Proto::Https => "https",
        }
    }
}

impl FromStr for Proto {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Proto::Http),
            "https" => Ok(Proto::Https),
            other => Err(format!("invalid proto: {other} (expected \"http\" or \"https\")")),
        }
    }
}
