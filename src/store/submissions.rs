// src/store/submissions.rs

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{Result, WesQueueError};
use crate::fs::FileSystem;
use crate::store::ids::next_submission_id;
use crate::store::{StatusFilter, Submission, SubmissionField, SubmissionId, QueueId};

pub const DEFAULT_STORE_FILE: &str = "submission_queue.json";

type Document = IndexMap<QueueId, IndexMap<SubmissionId, Submission>>;

/// Persisted submission records, keyed by queue then submission id.
///
/// Every mutation re-reads the whole document, applies one change and
/// writes the whole document back. Mutating methods take `&mut self`: the
/// store has exactly one owner, which is what keeps the read-modify-write
/// cycle free of lost updates.
#[derive(Debug)]
pub struct SubmissionStore<F: FileSystem> {
    fs: F,
    path: PathBuf,
}

impl<F: FileSystem> SubmissionStore<F> {
    pub fn new(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new `RECEIVED` submission and return its id.
    pub fn create(
        &mut self,
        queue_id: &str,
        data: Value,
        wes_id: Option<String>,
    ) -> Result<SubmissionId> {
        self.create_at(queue_id, data, wes_id, Utc::now())
    }

    /// [`create`](Self::create) with the id derived from `now`.
    pub fn create_at(
        &mut self,
        queue_id: &str,
        data: Value,
        wes_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SubmissionId> {
        let mut doc = self.read_document()?;
        let queue = doc.entry(queue_id.to_string()).or_default();

        let submission_id = next_submission_id(now, queue.keys());
        queue.insert(submission_id.clone(), Submission::received(data, wes_id.clone()));

        self.write_document(&doc)?;
        info!(
            queue = %queue_id,
            submission = %submission_id,
            wes = ?wes_id,
            "queued new submission"
        );
        Ok(submission_id)
    }

    /// Ids of the queue's submissions whose status passes `filter`, in
    /// creation order. An unknown queue yields an empty list.
    pub fn list(&self, queue_id: &str, filter: &StatusFilter) -> Result<Vec<SubmissionId>> {
        let doc = self.read_document()?;
        let ids = doc
            .get(queue_id)
            .map(|queue| {
                queue
                    .iter()
                    .filter(|(_, sub)| filter.matches(sub.status))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    pub fn get(&self, queue_id: &str, submission_id: &str) -> Result<Submission> {
        let mut doc = self.read_document()?;
        doc.get_mut(queue_id)
            .and_then(|queue| queue.swap_remove(submission_id))
            .ok_or_else(|| {
                WesQueueError::NotFound(format!(
                    "submission '{submission_id}' in queue '{queue_id}'"
                ))
            })
    }

    /// Set one field of a submission.
    ///
    /// Status writes must follow the lifecycle edges; anything else fails
    /// with `InvalidTransition` and leaves the document untouched.
    pub fn update(
        &mut self,
        queue_id: &str,
        submission_id: &str,
        field: SubmissionField,
    ) -> Result<()> {
        let mut doc = self.read_document()?;
        let submission = doc
            .get_mut(queue_id)
            .and_then(|queue| queue.get_mut(submission_id))
            .ok_or_else(|| {
                WesQueueError::NotFound(format!(
                    "submission '{submission_id}' in queue '{queue_id}'"
                ))
            })?;

        debug!(
            queue = %queue_id,
            submission = %submission_id,
            field = field.name(),
            "updating submission"
        );

        match field {
            SubmissionField::Status(next) => {
                if !submission.status.can_transition_to(next) {
                    return Err(WesQueueError::InvalidTransition {
                        from: submission.status,
                        to: next,
                    });
                }
                submission.status = next;
            }
            SubmissionField::RunLog(run_log) => submission.run_log = Some(run_log),
            SubmissionField::WesId(wes_id) => submission.wes_id = wes_id,
            SubmissionField::Data(data) => submission.data = data,
        }

        self.write_document(&doc)
    }

    /// Queues that have at least one submission recorded.
    pub fn queue_ids(&self) -> Result<Vec<QueueId>> {
        Ok(self.read_document()?.keys().cloned().collect())
    }

    /// Every submission of a queue, in creation order.
    pub fn get_queue(&self, queue_id: &str) -> Result<IndexMap<SubmissionId, Submission>> {
        let mut doc = self.read_document()?;
        Ok(doc.swap_remove(queue_id).unwrap_or_default())
    }

    fn read_document(&self) -> Result<Document> {
        if !self.fs.exists(&self.path) {
            return Ok(Document::new());
        }

        let contents = self.fs.read_to_string(&self.path).map_err(|e| {
            WesQueueError::StoreCorruption(format!("reading {:?}: {e:#}", self.path))
        })?;

        if contents.trim().is_empty() {
            return Ok(Document::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            WesQueueError::StoreCorruption(format!("parsing {:?}: {e}", self.path))
        })
    }

    fn write_document(&mut self, doc: &Document) -> Result<()> {
        let text = serde_json::to_string_pretty(doc)?;
        self.fs.write(&self.path, text.as_bytes())?;
        Ok(())
    }
}
