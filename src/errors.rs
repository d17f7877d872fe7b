// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::types::SubmissionStatus;

#[derive(Error, Debug)]
pub enum WesQueueError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Submission rejected: {0}")]
    Submission(String),

    #[error("Store corrupted: {0}")]
    StoreCorruption(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Downstream notification failed: {0}")]
    Notification(String),

    #[error("API contract error: {0}")]
    Contract(String),

    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for WesQueueError {
    fn from(err: reqwest::Error) -> Self {
        WesQueueError::Transport(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WesQueueError>;
