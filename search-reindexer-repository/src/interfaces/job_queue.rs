//! Durable job queue contract.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::QueueError;
use search_reindexer_shared::ReindexJob;

/// A job leased from a queue, identified for acknowledgment.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: String,
    pub attempt: u32,
    pub job: ReindexJob,
}

/// A named queue of batch-index jobs.
///
/// Jobs handed out by `dequeue` must be acknowledged with `complete` or `fail`.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Queue name, e.g. `fulltext-indexing`.
    fn name(&self) -> &str;

    /// Append a job, returning its identifier.
    async fn enqueue(&self, job: ReindexJob) -> Result<String, QueueError>;

    /// Lease the next job, waiting up to `wait` for one to arrive.
    ///
    /// Returns `Ok(None)` when no job became available in time.
    async fn dequeue(&self, wait: Duration) -> Result<Option<QueuedJob>, QueueError>;

    /// Acknowledge successful processing of a leased job.
    async fn complete(&self, job_id: &str) -> Result<(), QueueError>;

    /// Report failed processing of a leased job.
    async fn fail(&self, job_id: &str, reason: &str) -> Result<(), QueueError>;
}
