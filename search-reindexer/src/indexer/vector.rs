//! Vector sweeps.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::params::BackendReindexParams;
use super::SearchIndexer;
use crate::errors::ReindexError;
use crate::registry::EntityConfig;
use search_reindexer_repository::SearchStrategy;
use search_reindexer_shared::{BackendKind, IndexableRecord, ReindexResult};

impl SearchIndexer {
    /// Reindex one entity into the vector backend.
    ///
    /// With `purge_first` the entity's rows are removed before the first
    /// page. A held lock is returned as [`ReindexError::LockConflict`].
    #[instrument(skip(self, params), fields(tenant_id = %params.tenant_id, use_queue = params.use_queue))]
    pub async fn reindex_entity_to_vector(
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
        let strategy = match self.preflight(BackendKind::Vector, params).await {
            Ok(strategy) => strategy,
            Err(e) => return Ok(ReindexResult::failed(entity_id, e.to_string())),
        };

        let lock = self
            .acquire_sweep_lock(BackendKind::Vector, &format!("reindex:{}", entity_id), params)
            .await?;

        let mut result = ReindexResult::new();
        if params.purge_first {
            self.purge_vector_entity(&strategy, config, &params.tenant_id, &mut result)
                .await;
        }
        result.merge(
            self.backend_entity_sweep(
                BackendKind::Vector,
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

    /// Reindex every enabled entity into the vector backend under one lock.
    #[instrument(skip(self, params), fields(tenant_id = %params.tenant_id, use_queue = params.use_queue))]
    pub async fn reindex_all_to_vector(
        &self,
        params: &BackendReindexParams,
    ) -> Result<ReindexResult, ReindexError> {
        let strategy = match self.preflight(BackendKind::Vector, params).await {
            Ok(strategy) => strategy,
            Err(e) => return Ok(ReindexResult::failed("*", e.to_string())),
        };

        let lock = self
            .acquire_sweep_lock(BackendKind::Vector, "reindex:all", params)
            .await?;

        let mut result = ReindexResult::new();
        for config in self.registry.list_enabled() {
            if params.purge_first {
                self.purge_vector_entity(&strategy, config, &params.tenant_id, &mut result)
                    .await;
            }
            result.merge(
                self.backend_entity_sweep(
                    BackendKind::Vector,
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

    /// Remove the entity's vector rows and zero its vector coverage. A failed
    /// purge is recorded; the sweep still runs since indexing is idempotent
    /// per record.
    pub(crate) async fn purge_vector_entity(
        &self,
        strategy: &Arc<dyn SearchStrategy>,
        config: &EntityConfig,
        tenant_id: &str,
        result: &mut ReindexResult,
    ) {
        match strategy.purge(&config.entity_id, tenant_id).await {
            Ok(()) => {
                info!(entity_id = %config.entity_id, tenant_id = %tenant_id, "Vector rows purged");
                self.reset_coverage(BackendKind::Vector, &config.entity_id, tenant_id)
                    .await;
            }
            Err(e) => {
                error!(
                    entity_id = %config.entity_id,
                    tenant_id = %tenant_id,
                    error = %e,
                    "Vector purge failed"
                );
                result.record_error(&config.entity_id, format!("Purge failed: {}", e));
            }
        }
    }

    /// Index records one at a time. A failed record is recorded and the next
    /// record follows.
    pub(crate) async fn index_vector_records(
        &self,
        strategy: &Arc<dyn SearchStrategy>,
        entity_id: &str,
        records: &[IndexableRecord],
        result: &mut ReindexResult,
    ) {
        for record in records {
            match strategy.index(record).await {
                Ok(()) => result.records_indexed += 1,
                Err(e) => {
                    warn!(
                        entity_id = %entity_id,
                        record_id = %record.record_id,
                        error = %e,
                        "Failed to index record into vector backend"
                    );
                    result.record_error(
                        entity_id,
                        format!("Failed to index record {}: {}", record.record_id, e),
                    );
                }
            }
        }
    }
}
