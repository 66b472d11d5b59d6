//! The search indexer.
//!
//! [`SearchIndexer`] builds backend-ready records from raw domain records and
//! drives every reindex sweep:
//!
//! - single-record operations (`index_record`, `index_record_by_id`,
//!   `delete_record`, `purge_entity`, `bulk_index_records`)
//! - general sweeps through the search facade (`reindex_entity`, `reindex_all`)
//! - backend-specific sweeps with lock, queue dispatch and coverage upkeep
//!   (`reindex_entity_to_fulltext`, `reindex_entity_to_vector`, their `*_all`
//!   variants and `reindex_entity_partitioned`)

mod fulltext;
mod params;
mod partitioned;
mod record_builder;
mod single;
mod sweep;
mod vector;

pub use params::{
    BackendReindexParams, DeleteRecordParams, IndexByIdParams, IndexOutcome, IndexRecordParams,
    ProgressCallback, PurgeEntityParams, ReindexParams, SkipReason,
};
pub use record_builder::RecordScope;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error};

use crate::coverage::CoverageTracker;
use crate::errors::ReindexError;
use crate::lock::{AcquiredLock, ReindexLockManager, ReindexLockStatus};
use crate::queue::QueueDispatcher;
use crate::registry::{EntityConfig, EntityConfigRegistry};
use search_reindexer_repository::{QueryEngine, SearchService, SearchStrategy};
use search_reindexer_shared::{BackendKind, ReindexPhase, ReindexProgress};

/// Default number of records fetched per page.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Hard ceiling on pages per sweep.
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

/// Tuning of the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerConfig {
    pub page_size: u32,
    pub max_pages: u32,
    /// Key prefixes marking extension-field columns.
    pub custom_field_prefixes: Vec<String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            custom_field_prefixes: vec!["cf:".to_string(), "cf_".to_string()],
        }
    }
}

/// Orchestrates record building and reindex sweeps.
///
/// The registry is owned by the instance, so several indexers (one per test,
/// one per partition) can coexist. Cloning is cheap and shares the registry,
/// collaborators and drop counter.
#[derive(Clone)]
pub struct SearchIndexer {
    registry: Arc<EntityConfigRegistry>,
    query_engine: Arc<dyn QueryEngine>,
    search_service: Arc<dyn SearchService>,
    config: IndexerConfig,
    dispatcher: QueueDispatcher,
    lock_manager: Option<ReindexLockManager>,
    coverage: Option<CoverageTracker>,
    dropped: Arc<AtomicU64>,
}

impl SearchIndexer {
    pub fn new(
        registry: EntityConfigRegistry,
        query_engine: Arc<dyn QueryEngine>,
        search_service: Arc<dyn SearchService>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            query_engine,
            search_service,
            config: IndexerConfig::default(),
            dispatcher: QueueDispatcher::new(),
            lock_manager: None,
            coverage: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_config(mut self, config: IndexerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_queue_dispatcher(mut self, dispatcher: QueueDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_lock_manager(mut self, lock_manager: ReindexLockManager) -> Self {
        self.lock_manager = Some(lock_manager);
        self
    }

    pub fn with_coverage_tracker(mut self, coverage: CoverageTracker) -> Self {
        self.coverage = Some(coverage);
        self
    }

    /// A copy of this indexer reading records through another engine.
    pub fn with_query_engine(&self, query_engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            query_engine,
            ..self.clone()
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn registry(&self) -> &EntityConfigRegistry {
        &self.registry
    }

    pub fn list_enabled_entities(&self) -> Vec<&EntityConfig> {
        self.registry.list_enabled()
    }

    pub fn get_entity_config(&self, entity_id: &str) -> Option<&EntityConfig> {
        self.registry.get(entity_id)
    }

    pub fn is_entity_enabled(&self, entity_id: &str) -> bool {
        self.registry.is_enabled(entity_id)
    }

    /// Records dropped for lacking an identifier since the indexer was built.
    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub async fn acquire_reindex_lock(
        &self,
        lock_type: BackendKind,
        action: &str,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> Result<AcquiredLock, ReindexError> {
        self.lock_manager()?
            .acquire(lock_type, action, tenant_id, organization_id)
            .await
    }

    pub async fn get_reindex_lock_status(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
    ) -> Result<Option<ReindexLockStatus>, ReindexError> {
        Ok(self.lock_manager()?.status(lock_type, tenant_id).await?)
    }

    pub async fn clear_reindex_lock(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
    ) -> Result<bool, ReindexError> {
        Ok(self.lock_manager()?.clear(lock_type, tenant_id).await?)
    }

    fn lock_manager(&self) -> Result<&ReindexLockManager, ReindexError> {
        self.lock_manager
            .as_ref()
            .ok_or(ReindexError::MissingComponent("lock manager"))
    }

    fn strategy_for(&self, backend: BackendKind) -> Result<Arc<dyn SearchStrategy>, ReindexError> {
        self.search_service
            .get_strategy(backend.as_str())
            .ok_or(ReindexError::StrategyUnavailable(backend))
    }

    /// Validate a backend sweep before any I/O on records.
    async fn preflight(
        &self,
        backend: BackendKind,
        params: &BackendReindexParams,
    ) -> Result<Arc<dyn SearchStrategy>, ReindexError> {
        let strategy = self.strategy_for(backend)?;
        if !strategy.is_available().await {
            return Err(ReindexError::StrategyUnavailable(backend));
        }
        if params.use_queue && !self.dispatcher.has_queue(backend) {
            return Err(ReindexError::QueueNotConfigured(backend));
        }
        Ok(strategy)
    }

    async fn acquire_sweep_lock(
        &self,
        backend: BackendKind,
        action: &str,
        params: &BackendReindexParams,
    ) -> Result<Option<AcquiredLock>, ReindexError> {
        match &self.lock_manager {
            Some(manager) => Ok(Some(
                manager
                    .acquire(
                        backend,
                        action,
                        &params.tenant_id,
                        params.organization_id.as_deref(),
                    )
                    .await?,
            )),
            None => Ok(None),
        }
    }

    /// End a sweep's lock. Queued work keeps the lock until workers stop
    /// heartbeating; direct work clears it.
    async fn complete_lock(&self, lock: Option<AcquiredLock>, handed_to_workers: bool) {
        let Some(lock) = lock else {
            return;
        };

        if handed_to_workers {
            lock.hand_off();
            return;
        }

        let lock_type = lock.lock_type();
        let tenant_id = lock.tenant_id().to_string();
        if let Err(e) = lock.release().await {
            error!(
                lock_type = %lock_type,
                tenant_id = %tenant_id,
                error = %e,
                "Failed to release reindex lock, it will expire as stale"
            );
        }
    }

    /// Reset coverage of an entity after its rows were removed from `backend`.
    async fn reset_coverage(&self, backend: BackendKind, entity_id: &str, tenant_id: &str) {
        let Some(coverage) = &self.coverage else {
            return;
        };
        if let Err(e) = coverage.reset_after_purge(backend, entity_id, tenant_id).await {
            error!(
                backend = %backend,
                entity_id = %entity_id,
                tenant_id = %tenant_id,
                error = %e,
                "Failed to reset coverage"
            );
        }
    }

    /// Record the outcome of a complete direct sweep as the scope's coverage.
    async fn write_sweep_coverage(
        &self,
        backend: BackendKind,
        entity_id: &str,
        params: &BackendReindexParams,
        records_indexed: usize,
    ) {
        let Some(coverage) = &self.coverage else {
            return;
        };
        debug!(backend = %backend, entity_id = %entity_id, records_indexed, "Updating coverage");
        if let Err(e) = coverage
            .write_count(
                backend,
                entity_id,
                &params.tenant_id,
                params.organization_id.as_deref(),
                records_indexed as u64,
            )
            .await
        {
            error!(
                backend = %backend,
                entity_id = %entity_id,
                error = %e,
                "Failed to write coverage"
            );
        }
    }
}

fn report(
    on_progress: Option<&ProgressCallback>,
    entity_id: &str,
    phase: ReindexPhase,
    processed: u64,
    total: Option<u64>,
) {
    if let Some(callback) = on_progress {
        callback(ReindexProgress::new(entity_id, phase, processed, total));
    }
}
