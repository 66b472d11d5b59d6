//! Partitioned sweeps.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, instrument};

use super::params::BackendReindexParams;
use super::SearchIndexer;
use crate::errors::ReindexError;
use search_reindexer_repository::{Partition, QueryEngine};
use search_reindexer_shared::{BackendKind, ReindexResult};

impl SearchIndexer {
    /// Sweep one entity into `backend` as `partition_count` concurrent
    /// sweeps, each over its own shard of the record space.
    ///
    /// `engine_for` supplies an independent query engine per partition (its
    /// own connection). One lock covers all partitions; the destination is
    /// cleaned once before the partitions start.
    #[instrument(skip(self, params, engine_for), fields(tenant_id = %params.tenant_id))]
    pub async fn reindex_entity_partitioned<F>(
        &self,
        backend: BackendKind,
        entity_id: &str,
        params: &BackendReindexParams,
        partition_count: u32,
        engine_for: F,
    ) -> Result<ReindexResult, ReindexError>
    where
        F: Fn(Partition) -> Arc<dyn QueryEngine>,
    {
        let Some(config) = self.registry.get(entity_id) else {
            return Ok(ReindexResult::failed(
                entity_id,
                ReindexError::EntityNotConfigured(entity_id.to_string()).to_string(),
            ));
        };
        let strategy = match self.preflight(backend, params).await {
            Ok(strategy) => strategy,
            Err(e) => return Ok(ReindexResult::failed(entity_id, e.to_string())),
        };

        let lock = self
            .acquire_sweep_lock(backend, &format!("reindex:{}", entity_id), params)
            .await?;

        let mut result = ReindexResult::new();
        match backend {
            BackendKind::Fulltext if params.recreate_index => {
                if let Err(e) = self.recreate_fulltext_index(&strategy, &params.tenant_id).await {
                    result.record_error(entity_id, format!("Index recreation failed: {}", e));
                    self.complete_lock(lock, false).await;
                    return Ok(result);
                }
            }
            BackendKind::Vector if params.purge_first => {
                self.purge_vector_entity(&strategy, config, &params.tenant_id, &mut result)
                    .await;
            }
            _ => {}
        }

        let partition_count = partition_count.max(1);
        let strategy = &strategy;
        let lock_ref = lock.as_ref();
        let sweeps = Partition::all(partition_count).map(|partition| {
            let engine = engine_for(partition);
            let mut partition_params = params.clone();
            partition_params.partition = Some(partition);
            async move {
                self.sweep_backend_pages(
                    backend,
                    config,
                    strategy,
                    &engine,
                    &partition_params,
                    lock_ref,
                )
                .await
            }
        });

        let mut swept = ReindexResult::new();
        let mut complete = true;
        for partition_sweep in join_all(sweeps).await {
            complete &= partition_sweep.is_complete();
            swept.merge(partition_sweep.result);
        }
        swept.entities_processed = 1;

        if !params.use_queue && complete {
            self.write_sweep_coverage(backend, entity_id, params, swept.records_indexed)
                .await;
        }
        result.merge(swept);

        info!(
            backend = %backend,
            entity_id = %entity_id,
            partitions = partition_count,
            records_indexed = result.records_indexed,
            jobs_enqueued = result.jobs_enqueued,
            "Partitioned sweep complete"
        );

        self.complete_lock(lock, params.use_queue && result.jobs_enqueued > 0)
            .await;
        Ok(result)
    }
}
