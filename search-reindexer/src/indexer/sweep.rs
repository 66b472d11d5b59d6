//! Paginated sweeps.
//!
//! Every sweep walks the record store page by page through a [`Paginator`],
//! which stops on a short page, on reaching the reported total, on a query
//! failure, or after `max_pages` pages whatever the store answers.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::params::{BackendReindexParams, PurgeEntityParams, ReindexParams};
use super::record_builder::RecordScope;
use super::{report, SearchIndexer};
use crate::lock::AcquiredLock;
use crate::registry::EntityConfig;
use search_reindexer_repository::{
    PageRequest, Partition, QueryEngine, QueryError, QueryOptions, QueryPage, SearchStrategy,
};
use search_reindexer_shared::{BackendKind, RecordRef, ReindexPhase, ReindexResult};

/// Walks the pages of one entity within a scope.
pub(crate) struct Paginator<'a> {
    engine: &'a dyn QueryEngine,
    entity_id: &'a str,
    scope: RecordScope<'a>,
    partition: Option<Partition>,
    page_size: u32,
    max_pages: u32,
    page: u32,
    fetched: u64,
    done: bool,
    reached_ceiling: bool,
}

impl<'a> Paginator<'a> {
    pub(crate) fn new(
        engine: &'a dyn QueryEngine,
        entity_id: &'a str,
        scope: RecordScope<'a>,
        partition: Option<Partition>,
        page_size: u32,
        max_pages: u32,
    ) -> Self {
        Self {
            engine,
            entity_id,
            scope,
            partition,
            page_size: page_size.max(1),
            max_pages,
            page: 0,
            fetched: 0,
            done: false,
            reached_ceiling: false,
        }
    }

    /// Number of pages requested so far.
    pub(crate) fn pages_fetched(&self) -> u32 {
        self.page
    }

    /// True if the sweep was cut off by `max_pages` rather than by running
    /// out of records.
    pub(crate) fn reached_ceiling(&self) -> bool {
        self.reached_ceiling
    }

    /// Fetch the next page, or `None` once the sweep is over.
    pub(crate) async fn next_page(&mut self) -> Option<Result<QueryPage, QueryError>> {
        if self.done {
            return None;
        }
        if self.page >= self.max_pages {
            warn!(
                entity_id = %self.entity_id,
                max_pages = self.max_pages,
                fetched = self.fetched,
                "Page ceiling reached, stopping sweep"
            );
            self.done = true;
            self.reached_ceiling = true;
            return None;
        }

        self.page += 1;
        let mut options = QueryOptions::page(
            self.scope.tenant_id,
            self.scope.organization_id.map(str::to_string),
            PageRequest::new(self.page, self.page_size),
        );
        options.partition = self.partition;

        match self.engine.query(self.entity_id, options).await {
            Ok(page) => {
                let count = page.items.len() as u64;
                self.fetched += count;
                if count < u64::from(self.page_size) || (page.total > 0 && self.fetched >= page.total)
                {
                    self.done = true;
                }
                Some(Ok(page))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn record_refs(records: &[search_reindexer_shared::IndexableRecord]) -> Vec<RecordRef> {
    records
        .iter()
        .map(|record| RecordRef::new(&record.entity_id, &record.record_id))
        .collect()
}

impl SearchIndexer {
    /// Reindex one entity through every strategy of the search facade.
    ///
    /// Per-record indexing failures are recorded and the sweep continues; a
    /// query failure ends the sweep.
    #[instrument(skip(self, params), fields(tenant_id = %params.tenant_id))]
    pub async fn reindex_entity(&self, entity_id: &str, params: &ReindexParams) -> ReindexResult {
        let Some(config) = self.registry.get(entity_id) else {
            warn!(entity_id = %entity_id, "Reindex requested for unconfigured entity");
            return ReindexResult::failed(entity_id, "Entity not configured for indexing");
        };

        let on_progress = params.on_progress.as_ref();
        let scope = RecordScope::new(&params.tenant_id, params.organization_id.as_deref());
        let mut result = ReindexResult::new();
        report(on_progress, entity_id, ReindexPhase::Starting, 0, None);

        if params.purge_first {
            if let Err(e) = self
                .purge_entity(&PurgeEntityParams::new(entity_id, &params.tenant_id))
                .await
            {
                error!(entity_id = %entity_id, error = %e, "Purge before reindex failed");
                result.record_error(entity_id, format!("Purge failed: {}", e));
            }
        }

        let mut paginator = Paginator::new(
            self.query_engine.as_ref(),
            entity_id,
            scope,
            None,
            self.config.page_size,
            self.config.max_pages,
        );
        let mut processed: u64 = 0;
        let mut total: Option<u64> = None;

        while let Some(page) = paginator.next_page().await {
            report(on_progress, entity_id, ReindexPhase::Fetching, processed, total);

            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        entity_id = %entity_id,
                        page = paginator.pages_fetched(),
                        error = %e,
                        "Query failed, aborting sweep"
                    );
                    result.record_error(
                        entity_id,
                        format!("Query failed on page {}: {}", paginator.pages_fetched(), e),
                    );
                    break;
                }
            };
            total.get_or_insert(page.total);

            let (records, dropped) = self
                .build_page(config, &page.items, scope, &self.query_engine)
                .await;
            result.records_dropped += dropped;
            report(on_progress, entity_id, ReindexPhase::Indexing, processed, total);

            for record in &records {
                match self.search_service.index(record).await {
                    Ok(()) => result.records_indexed += 1,
                    Err(e) => {
                        warn!(
                            entity_id = %entity_id,
                            record_id = %record.record_id,
                            error = %e,
                            "Failed to index record"
                        );
                        result.record_error(
                            entity_id,
                            format!("Failed to index record {}: {}", record.record_id, e),
                        );
                    }
                }
            }
            processed += page.items.len() as u64;
        }

        result.entities_processed = 1;
        report(on_progress, entity_id, ReindexPhase::Complete, processed, total);
        info!(
            entity_id = %entity_id,
            records_indexed = result.records_indexed,
            records_dropped = result.records_dropped,
            errors = result.errors.len(),
            "Entity reindex complete"
        );
        result
    }

    /// Reindex every enabled entity through the search facade.
    #[instrument(skip(self, params), fields(tenant_id = %params.tenant_id))]
    pub async fn reindex_all(&self, params: &ReindexParams) -> ReindexResult {
        let mut result = ReindexResult::new();
        for config in self.registry.list_enabled() {
            result.merge(self.reindex_entity(&config.entity_id, params).await);
        }
        result
    }

    /// Sweep one entity into one backend and, for a complete direct-mode
    /// sweep of the whole record space, record the indexed count as coverage.
    pub(crate) async fn backend_entity_sweep(
        &self,
        backend: BackendKind,
        config: &EntityConfig,
        strategy: &Arc<dyn SearchStrategy>,
        engine: &Arc<dyn QueryEngine>,
        params: &BackendReindexParams,
        lock: Option<&AcquiredLock>,
    ) -> ReindexResult {
        let swept = self
            .sweep_backend_pages(backend, config, strategy, engine, params, lock)
            .await;

        if !params.use_queue && params.partition.is_none() && swept.is_complete() {
            self.write_sweep_coverage(
                backend,
                &config.entity_id,
                params,
                swept.result.records_indexed,
            )
            .await;
        }
        swept.result
    }

    /// Page through one entity into one backend.
    ///
    /// Direct-mode failures are contained at a different granularity per
    /// backend: a failed full-text batch is recorded and the next page
    /// follows; a failed vector record is recorded and the next record
    /// follows. A query failure ends the sweep in both cases.
    pub(crate) async fn sweep_backend_pages(
        &self,
        backend: BackendKind,
        config: &EntityConfig,
        strategy: &Arc<dyn SearchStrategy>,
        engine: &Arc<dyn QueryEngine>,
        params: &BackendReindexParams,
        lock: Option<&AcquiredLock>,
    ) -> BackendSweep {
        let entity_id = config.entity_id.as_str();
        let on_progress = params.on_progress.as_ref();
        let scope = RecordScope::new(&params.tenant_id, params.organization_id.as_deref());
        let mut result = ReindexResult::new();
        report(on_progress, entity_id, ReindexPhase::Starting, 0, None);

        let mut paginator = Paginator::new(
            engine.as_ref(),
            entity_id,
            scope,
            params.partition,
            params.page_size.unwrap_or(self.config.page_size),
            self.config.max_pages,
        );
        let mut processed: u64 = 0;
        let mut total: Option<u64> = None;

        while let Some(page) = paginator.next_page().await {
            let page_number = paginator.pages_fetched();
            report(on_progress, entity_id, ReindexPhase::Fetching, processed, total);

            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        backend = %backend,
                        entity_id = %entity_id,
                        page = page_number,
                        error = %e,
                        "Query failed, aborting sweep"
                    );
                    result.record_error(
                        entity_id,
                        format!("Query failed on page {}: {}", page_number, e),
                    );
                    break;
                }
            };
            let first_page = total.is_none();
            total.get_or_insert(page.total);

            let (records, dropped) = self.build_page(config, &page.items, scope, engine).await;
            result.records_dropped += dropped;
            report(on_progress, entity_id, ReindexPhase::Indexing, processed, total);

            if !records.is_empty() {
                if params.use_queue {
                    match self
                        .dispatcher
                        .dispatch(
                            backend,
                            &params.tenant_id,
                            params.organization_id.as_deref(),
                            record_refs(&records),
                        )
                        .await
                    {
                        Ok(_) => result.jobs_enqueued += 1,
                        Err(e) => {
                            error!(
                                backend = %backend,
                                entity_id = %entity_id,
                                page = page_number,
                                error = %e,
                                "Failed to enqueue batch"
                            );
                            result.record_error(
                                entity_id,
                                format!("Failed to enqueue page {}: {}", page_number, e),
                            );
                        }
                    }
                } else {
                    match backend {
                        BackendKind::Fulltext => {
                            self.index_fulltext_batch(strategy, entity_id, page_number, &records, &mut result)
                                .await
                        }
                        BackendKind::Vector => {
                            self.index_vector_records(strategy, entity_id, &records, &mut result)
                                .await
                        }
                    }
                }
            }

            processed += page.items.len() as u64;
            if let Some(lock) = lock {
                // Queued records are counted by the workers that index them.
                let processed_delta = if params.use_queue {
                    0
                } else {
                    page.items.len() as u64
                };
                let total_delta = if first_page { page.total } else { 0 };
                if let Err(e) = lock.heartbeat(processed_delta, total_delta).await {
                    warn!(entity_id = %entity_id, error = %e, "Failed to heartbeat reindex lock");
                }
            }
        }

        result.entities_processed = 1;
        report(on_progress, entity_id, ReindexPhase::Complete, processed, total);

        info!(
            backend = %backend,
            entity_id = %entity_id,
            pages = paginator.pages_fetched(),
            records_indexed = result.records_indexed,
            records_dropped = result.records_dropped,
            jobs_enqueued = result.jobs_enqueued,
            errors = result.errors.len(),
            reached_ceiling = paginator.reached_ceiling(),
            "Backend sweep complete"
        );
        BackendSweep {
            result,
            reached_ceiling: paginator.reached_ceiling(),
        }
    }
}

/// Outcome of paging one entity into one backend.
pub(crate) struct BackendSweep {
    pub(crate) result: ReindexResult,
    pub(crate) reached_ceiling: bool,
}

impl BackendSweep {
    /// True if every page was read and handled without error, so the indexed
    /// count reflects the whole scope.
    pub(crate) fn is_complete(&self) -> bool {
        !self.reached_ceiling && self.result.errors.is_empty()
    }
}
