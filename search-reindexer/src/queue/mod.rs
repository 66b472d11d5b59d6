//! Queue dispatch and the worker consuming batch-index jobs.

mod worker;

pub use worker::{ReindexWorker, WorkerConfig, WorkerStats};

use std::sync::Arc;

use tracing::debug;

use crate::errors::ReindexError;
use search_reindexer_repository::JobQueue;
use search_reindexer_shared::{BackendKind, RecordRef, ReindexJob};

/// Name of the queue carrying full-text batch jobs.
pub const FULLTEXT_QUEUE: &str = "fulltext-indexing";

/// Name of the queue carrying vector batch jobs.
pub const VECTOR_QUEUE: &str = "vector-indexing";

/// Routes batch-index jobs to the queue of their backend.
#[derive(Clone, Default)]
pub struct QueueDispatcher {
    fulltext: Option<Arc<dyn JobQueue>>,
    vector: Option<Arc<dyn JobQueue>>,
}

impl QueueDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fulltext_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.fulltext = Some(queue);
        self
    }

    pub fn with_vector_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.vector = Some(queue);
        self
    }

    /// The queue bound for `backend`, if any.
    pub fn queue_for(&self, backend: BackendKind) -> Option<&Arc<dyn JobQueue>> {
        match backend {
            BackendKind::Fulltext => self.fulltext.as_ref(),
            BackendKind::Vector => self.vector.as_ref(),
        }
    }

    pub fn has_queue(&self, backend: BackendKind) -> bool {
        self.queue_for(backend).is_some()
    }

    /// Enqueue one job referencing `records`. Returns the job id.
    pub async fn dispatch(
        &self,
        backend: BackendKind,
        tenant_id: &str,
        organization_id: Option<&str>,
        records: Vec<RecordRef>,
    ) -> Result<String, ReindexError> {
        let queue = self
            .queue_for(backend)
            .ok_or(ReindexError::QueueNotConfigured(backend))?;

        let record_count = records.len();
        let job = ReindexJob::batch_index(tenant_id, organization_id.map(str::to_string), records);
        let job_id = queue.enqueue(job).await?;

        debug!(
            queue = %queue.name(),
            job_id = %job_id,
            tenant_id = %tenant_id,
            record_count,
            "Dispatched batch-index job"
        );
        Ok(job_id)
    }
}
