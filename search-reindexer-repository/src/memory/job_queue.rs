//! In-memory job queue.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::QueueError;
use crate::interfaces::{JobQueue, QueuedJob};
use search_reindexer_shared::ReindexJob;

/// Default number of attempts before a failing job is dead-lettered.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedJob>,
    leased: HashMap<String, QueuedJob>,
    dead_letters: Vec<(QueuedJob, String)>,
    closed: bool,
}

/// FIFO queue with lease/acknowledge semantics.
///
/// Failed jobs are re-queued until they reach `max_attempts`, then moved to
/// the dead-letter list.
pub struct InMemoryJobQueue {
    name: String,
    max_attempts: u32,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl InMemoryJobQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_max_attempts(name, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(name: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            name: name.into(),
            max_attempts: max_attempts.max(1),
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }

    /// Number of jobs waiting to be leased.
    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Number of jobs leased but not yet acknowledged.
    pub async fn leased_len(&self) -> usize {
        self.state.lock().await.leased.len()
    }

    /// Jobs that exhausted their attempts, with the last failure reason.
    pub async fn dead_letters(&self) -> Vec<(QueuedJob, String)> {
        self.state.lock().await.dead_letters.clone()
    }

    /// Jobs currently waiting, in order.
    pub async fn pending_jobs(&self) -> Vec<ReindexJob> {
        self.state
            .lock()
            .await
            .pending
            .iter()
            .map(|queued| queued.job.clone())
            .collect()
    }

    /// Stop accepting new jobs. Pending jobs can still be drained.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
    }

    async fn try_lease(&self) -> Option<QueuedJob> {
        let mut state = self.state.lock().await;
        let mut queued = state.pending.pop_front()?;
        queued.attempt += 1;
        state.leased.insert(queued.id.clone(), queued.clone());
        Some(queued)
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enqueue(&self, job: ReindexJob) -> Result<String, QueueError> {
        let id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(QueueError::Closed(self.name.clone()));
            }
            state.pending.push_back(QueuedJob {
                id: id.clone(),
                attempt: 0,
                job,
            });
        }
        self.notify.notify_one();
        debug!(queue = %self.name, job_id = %id, "Job enqueued");
        Ok(id)
    }

    async fn dequeue(&self, wait: Duration) -> Result<Option<QueuedJob>, QueueError> {
        if let Some(job) = self.try_lease().await {
            return Ok(Some(job));
        }
        if wait.is_zero() {
            return Ok(None);
        }

        let _ = tokio::time::timeout(wait, self.notify.notified()).await;
        Ok(self.try_lease().await)
    }

    async fn complete(&self, job_id: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state
            .leased
            .remove(job_id)
            .map(|_| ())
            .ok_or_else(|| QueueError::UnknownJob(job_id.to_string()))
    }

    async fn fail(&self, job_id: &str, reason: &str) -> Result<(), QueueError> {
        let requeued = {
            let mut state = self.state.lock().await;
            let queued = state
                .leased
                .remove(job_id)
                .ok_or_else(|| QueueError::UnknownJob(job_id.to_string()))?;

            if queued.attempt >= self.max_attempts {
                warn!(
                    queue = %self.name,
                    job_id = %job_id,
                    attempts = queued.attempt,
                    reason = %reason,
                    "Job exhausted its attempts, moving to dead letters"
                );
                state.dead_letters.push((queued, reason.to_string()));
                false
            } else {
                state.pending.push_back(queued);
                true
            }
        };

        if requeued {
            self.notify.notify_one();
        }
        Ok(())
    }
}
