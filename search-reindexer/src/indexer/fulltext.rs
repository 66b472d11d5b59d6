//! Full-text sweeps.

use std::sync::Arc;

use tracing::{error, info, instrument};

use super::params::BackendReindexParams;
use super::SearchIndexer;
use crate::errors::ReindexError;
use search_reindexer_repository::SearchStrategy;
use search_reindexer_shared::{BackendKind, IndexableRecord, ReindexResult};

impl SearchIndexer {
    /// Reindex one entity into the full-text backend.
    ///
    /// Configuration problems come back as an unsuccessful result. A held
    /// lock is returned as [`ReindexError::LockConflict`] before any record
    /// is read.
    #[instrument(skip(self, params), fields(tenant_id = %params.tenant_id, use_queue = params.use_queue))]
    pub async fn reindex_entity_to_fulltext(
        &self,
        entity_id: &str,
        params: &BackendReindexParams,
    ) -> Result<ReindexResult, ReindexError> {
        let Some(config) = self.registry.get(entity_id) else {
            return Ok(ReindexResult::failed(
                entity_id,
                ReindexError::EntityNotConfigured(entity_id.to_string()).to_string(),
            ));
        };
        let strategy = match self.preflight(BackendKind::Fulltext, params).await {
            Ok(strategy) => strategy,
            Err(e) => return Ok(ReindexResult::failed(entity_id, e.to_string())),
        };

        let lock = self
            .acquire_sweep_lock(BackendKind::Fulltext, &format!("reindex:{}", entity_id), params)
            .await?;

        let mut result = ReindexResult::new();
        if params.recreate_index {
            if let Err(e) = self.recreate_fulltext_index(&strategy, &params.tenant_id).await {
                result.record_error(entity_id, format!("Index recreation failed: {}", e));
                self.complete_lock(lock, false).await;
                return Ok(result);
            }
        }

        result.merge(
            self.backend_entity_sweep(
                BackendKind::Fulltext,
                config,
                &strategy,
                &self.query_engine,
                params,
                lock.as_ref(),
            )
            .await,
        );

        self.complete_lock(lock, params.use_queue && result.jobs_enqueued > 0)
            .await;
        Ok(result)
    }

    /// Reindex every enabled entity into the full-text backend under one lock.
    #[instrument(skip(self, params), fields(tenant_id = %params.tenant_id, use_queue = params.use_queue))]
    pub async fn reindex_all_to_fulltext(
        &self,
        params: &BackendReindexParams,
    ) -> Result<ReindexResult, ReindexError> {
        let strategy = match self.preflight(BackendKind::Fulltext, params).await {
            Ok(strategy) => strategy,
            Err(e) => return Ok(ReindexResult::failed("*", e.to_string())),
        };

        let lock = self
            .acquire_sweep_lock(BackendKind::Fulltext, "reindex:all", params)
            .await?;

        let mut result = ReindexResult::new();
        if params.recreate_index {
            if let Err(e) = self.recreate_fulltext_index(&strategy, &params.tenant_id).await {
                result.record_error("*", format!("Index recreation failed: {}", e));
                self.complete_lock(lock, false).await;
                return Ok(result);
            }
        }

        for config in self.registry.list_enabled() {
            result.merge(
                self.backend_entity_sweep(
                    BackendKind::Fulltext,
                    config,
                    &strategy,
                    &self.query_engine,
                    params,
                    lock.as_ref(),
                )
                .await,
            );
        }

        self.complete_lock(lock, params.use_queue && result.jobs_enqueued > 0)
            .await;
        Ok(result)
    }

    /// Drop and recreate the tenant index, then zero the full-text coverage
    /// of every enabled entity.
    pub(crate) async fn recreate_fulltext_index(
        &self,
        strategy: &Arc<dyn SearchStrategy>,
        tenant_id: &str,
    ) -> Result<(), ReindexError> {
        if let Err(e) = strategy.recreate_index(tenant_id).await {
            error!(tenant_id = %tenant_id, error = %e, "Failed to recreate full-text index");
            return Err(e.into());
        }
        info!(tenant_id = %tenant_id, "Full-text index recreated");

        for config in self.registry.list_enabled() {
            self.reset_coverage(BackendKind::Fulltext, &config.entity_id, tenant_id)
                .await;
        }
        Ok(())
    }

    /// Index one page in a single bulk call. A failed call is recorded and
    /// the sweep moves on to the next page.
    pub(crate) async fn index_fulltext_batch(
        &self,
        strategy: &Arc<dyn SearchStrategy>,
        entity_id: &str,
        page_number: u32,
        records: &[IndexableRecord],
        result: &mut ReindexResult,
    ) {
        match strategy.bulk_index(records).await {
            Ok(summary) => {
                result.records_indexed += summary.succeeded;
                if summary.failed > 0 {
                    let first_error = summary
                        .failures()
                        .find_map(|failure| failure.error.as_ref().map(|e| e.to_string()))
                        .unwrap_or_default();
                    error!(
                        entity_id = %entity_id,
                        page = page_number,
                        failed = summary.failed,
                        total = summary.total,
                        error = %first_error,
                        "Records failed in full-text batch"
                    );
                    result.record_error(
                        entity_id,
                        format!(
                            "{} of {} records failed on page {}: {}",
                            summary.failed, summary.total, page_number, first_error
                        ),
                    );
                }
            }
            Err(e) => {
                error!(
                    entity_id = %entity_id,
                    page = page_number,
                    records = records.len(),
                    error = %e,
                    "Full-text batch failed, continuing with next page"
                );
                result.record_error(
                    entity_id,
                    format!("Batch failed on page {}: {}", page_number, e),
                );
            }
        }
    }
}
