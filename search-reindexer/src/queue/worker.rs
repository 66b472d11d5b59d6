//! Worker consuming batch-index jobs.
//!
//! A job only carries record references. The worker reloads every referenced
//! record through [`SearchIndexer::index_record_by_id`], so it always indexes
//! current data, then acknowledges the job and refreshes the backend's
//! reindex lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::indexer::{IndexByIdParams, IndexOutcome, SearchIndexer};
use crate::lock::ReindexLockManager;
use search_reindexer_repository::{JobQueue, QueuedJob};
use search_reindexer_shared::BackendKind;

/// Configuration of a worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of jobs processed at once.
    pub concurrency: usize,
    /// How long one dequeue waits for a job.
    pub poll_interval: Duration,
    /// Interval of the throughput log line.
    pub progress_log_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_secs(1),
            progress_log_interval: Duration::from_secs(10),
        }
    }
}

/// Counters of a worker since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub records_indexed: u64,
    pub records_skipped: u64,
}

struct JobReport {
    indexed: u64,
    skipped: u64,
    failures: Vec<String>,
}

/// Consumes one backend's queue.
pub struct ReindexWorker {
    indexer: SearchIndexer,
    queue: Arc<dyn JobQueue>,
    backend: BackendKind,
    lock_manager: Option<ReindexLockManager>,
    config: WorkerConfig,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    records_indexed: AtomicU64,
    records_skipped: AtomicU64,
}

impl ReindexWorker {
    pub fn new(indexer: SearchIndexer, queue: Arc<dyn JobQueue>, backend: BackendKind) -> Self {
        Self {
            indexer,
            queue,
            backend,
            lock_manager: None,
            config: WorkerConfig::default(),
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            records_indexed: AtomicU64::new(0),
            records_skipped: AtomicU64::new(0),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Refresh this lock manager's lock for the backend after every job.
    pub fn with_lock_manager(mut self, lock_manager: ReindexLockManager) -> Self {
        self.lock_manager = Some(lock_manager);
        self
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            records_indexed: self.records_indexed.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
        }
    }

    /// Process jobs until `shutdown` fires, then wait for in-flight jobs.
    #[instrument(skip(self, shutdown), fields(queue = %self.queue.name(), backend = %self.backend))]
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> WorkerStats {
        let concurrency = self.config.concurrency.max(1);
        info!(concurrency, "Starting reindex worker");

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks = JoinSet::new();

        let mut progress_timer = interval(self.config.progress_log_interval);
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut prev = self.stats();
        let mut prev_time = Instant::now();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = progress_timer.tick() => {
                    let stats = self.stats();
                    let now = Instant::now();
                    let elapsed_secs = now.duration_since(prev_time).as_secs_f64();
                    let (jobs_per_sec, records_per_sec) = if elapsed_secs > 0.0 {
                        (
                            (stats.jobs_completed.saturating_sub(prev.jobs_completed)) as f64 / elapsed_secs,
                            (stats.records_indexed.saturating_sub(prev.records_indexed)) as f64 / elapsed_secs,
                        )
                    } else {
                        (0.0, 0.0)
                    };

                    info!(
                        jobs_completed = stats.jobs_completed,
                        jobs_failed = stats.jobs_failed,
                        records_indexed = stats.records_indexed,
                        jobs_per_sec = format!("{:.1}", jobs_per_sec),
                        records_per_sec = format!("{:.1}", records_per_sec),
                        in_flight = concurrency - semaphore.available_permits(),
                        "Worker progress"
                    );
                    prev = stats;
                    prev_time = now;
                }
                permit = semaphore.clone().acquire_owned() => {
                    let Ok(permit) = permit else {
                        break;
                    };
                    match self.queue.dequeue(self.config.poll_interval).await {
                        Ok(Some(job)) => {
                            let worker = Arc::clone(&self);
                            tasks.spawn(async move {
                                worker.handle(job).await;
                                drop(permit);
                            });
                        }
                        Ok(None) => drop(permit),
                        Err(e) => {
                            drop(permit);
                            error!(error = %e, "Failed to dequeue job");
                            sleep(self.config.poll_interval).await;
                        }
                    }
                }
            }

            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    error!(error = %e, "Worker task panicked");
                }
            }
        }

        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                error!(error = %e, "Worker task panicked");
            }
        }

        let stats = self.stats();
        info!(
            jobs_completed = stats.jobs_completed,
            jobs_failed = stats.jobs_failed,
            records_indexed = stats.records_indexed,
            "Reindex worker stopped"
        );
        stats
    }

    /// Process every job currently queued, one at a time, and return.
    pub async fn drain(&self) -> WorkerStats {
        loop {
            match self.queue.dequeue(Duration::ZERO).await {
                Ok(Some(job)) => self.handle(job).await,
                Ok(None) => break,
                Err(e) => {
                    error!(queue = %self.queue.name(), error = %e, "Failed to dequeue job");
                    break;
                }
            }
        }
        self.stats()
    }

    /// Process one job and acknowledge it.
    async fn handle(&self, queued: QueuedJob) {
        let report = self.process_job(&queued).await;

        self.records_indexed.fetch_add(report.indexed, Ordering::Relaxed);
        self.records_skipped.fetch_add(report.skipped, Ordering::Relaxed);

        let ack = if report.failures.is_empty() {
            self.jobs_completed.fetch_add(1, Ordering::Relaxed);
            self.queue.complete(&queued.id).await
        } else {
            self.jobs_failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                job_id = %queued.id,
                attempt = queued.attempt,
                failures = report.failures.len(),
                first_failure = %report.failures[0],
                "Job failed"
            );
            self.queue.fail(&queued.id, &report.failures.join("; ")).await
        };
        if let Err(e) = ack {
            error!(job_id = %queued.id, error = %e, "Failed to acknowledge job");
        }

        if let Some(lock_manager) = &self.lock_manager {
            let processed = report.indexed + report.skipped;
            if let Err(e) = lock_manager
                .touch(self.backend, &queued.job.tenant_id, processed)
                .await
            {
                warn!(tenant_id = %queued.job.tenant_id, error = %e, "Failed to refresh reindex lock");
            }
        }
    }

    async fn process_job(&self, queued: &QueuedJob) -> JobReport {
        let job = &queued.job;
        let mut report = JobReport {
            indexed: 0,
            skipped: 0,
            failures: Vec::new(),
        };

        for reference in &job.records {
            let params = IndexByIdParams::new(&reference.entity_id, &reference.record_id, &job.tenant_id)
                .with_organization(job.organization_id.clone())
                .for_backend(Some(self.backend));

            match self.indexer.index_record_by_id(&params).await {
                Ok(IndexOutcome::Indexed) => report.indexed += 1,
                Ok(IndexOutcome::Skipped(reason)) => {
                    debug!(
                        entity_id = %reference.entity_id,
                        record_id = %reference.record_id,
                        reason = reason.as_str(),
                        "Record skipped"
                    );
                    report.skipped += 1;
                }
                Err(e) => report.failures.push(format!(
                    "{}/{}: {}",
                    reference.entity_id, reference.record_id, e
                )),
            }
        }

        debug!(
            job_id = %queued.id,
            indexed = report.indexed,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Job processed"
        );
        report
    }
}
