// src/notify/mod.rs

//! Downstream notification when a run completes on a queue that has a
//! `target_queue`.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{Result, WesQueueError};
use crate::fs::FileSystem;

pub const DEFAULT_VERIFICATIONS_FILE: &str = "verifications.json";

#[async_trait]
pub trait DownstreamNotifier: Send + Sync {
    /// Record that the workflow behind `target_queue` ran successfully on
    /// `wes_id`.
    async fn notify(&self, target_queue: &str, wes_id: &str) -> Result<()>;
}

/// One recorded verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub wes_id: String,
    pub verified_at: DateTime<Utc>,
}

/// Appends verification events to a JSON document keyed by target queue.
#[derive(Debug, Clone)]
pub struct VerificationLog<F: FileSystem> {
    fs: F,
    path: PathBuf,
}

impl<F: FileSystem> VerificationLog<F> {
    pub fn new(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn entries(&self) -> Result<IndexMap<String, Vec<Verification>>> {
        if !self.fs.exists(&self.path) {
            return Ok(IndexMap::new());
        }
        let contents = self.fs.read_to_string(&self.path).map_err(|e| {
            WesQueueError::Notification(format!("reading {:?}: {e:#}", self.path))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            WesQueueError::Notification(format!("parsing {:?}: {e}", self.path))
        })
    }
}

#[async_trait]
impl<F: FileSystem> DownstreamNotifier for VerificationLog<F> {
    async fn notify(&self, target_queue: &str, wes_id: &str) -> Result<()> {
        let mut entries = self.entries()?;
        entries
            .entry(target_queue.to_string())
            .or_default()
            .push(Verification {
                wes_id: wes_id.to_string(),
                verified_at: Utc::now(),
            });

        let text = serde_json::to_string_pretty(&entries)?;
        self.fs.write(&self.path, text.as_bytes())?;
        info!(target_queue = %target_queue, wes = %wes_id, "recorded verification");
        Ok(())
    }
}
