//! Single-record operations and the bulk path for pre-built inputs.

use serde_json::Value;
use tracing::{debug, info, instrument};

use super::params::{
    DeleteRecordParams, IndexByIdParams, IndexOutcome, IndexRecordParams, PurgeEntityParams,
    SkipReason,
};
use super::record_builder::{split_custom_fields, BuildMode, RecordScope};
use super::SearchIndexer;
use crate::errors::ReindexError;
use search_reindexer_repository::{BatchOperationSummary, PageRequest, QueryOptions};
use search_reindexer_shared::{BackendKind, IndexableRecord};

impl SearchIndexer {
    /// Build one record and index it.
    ///
    /// Unknown or disabled entities and records without an identifier are
    /// skipped; backend failures are returned.
    #[instrument(skip(self, params), fields(entity_id = %params.entity_id, tenant_id = %params.tenant_id))]
    pub async fn index_record(
        &self,
        params: &IndexRecordParams,
    ) -> Result<IndexOutcome, ReindexError> {
        let Some(config) = self.registry.get(&params.entity_id) else {
            debug!("Entity not configured, skipping record");
            return Ok(IndexOutcome::Skipped(SkipReason::EntityNotConfigured));
        };

        let scope = RecordScope::new(&params.tenant_id, params.organization_id.as_deref());
        let Some(record) = self
            .build_indexable_record(
                config,
                &params.record,
                params.record_id.as_deref(),
                scope,
                Some(&params.custom_fields),
            )
            .await
        else {
            return Ok(IndexOutcome::Skipped(SkipReason::MissingIdentifier));
        };

        self.index_built(&record, params.backend).await?;
        debug!(record_id = %record.record_id, "Record indexed");
        Ok(IndexOutcome::Indexed)
    }

    /// Load a record fresh from the record store and index it.
    ///
    /// Returns `Skipped` when the entity is not configured or the record no
    /// longer exists. Load failures are returned.
    #[instrument(skip(self, params), fields(
        entity_id = %params.entity_id,
        record_id = %params.record_id,
        tenant_id = %params.tenant_id
    ))]
    pub async fn index_record_by_id(
        &self,
        params: &IndexByIdParams,
    ) -> Result<IndexOutcome, ReindexError> {
        if !self.registry.is_enabled(&params.entity_id) {
            return Ok(IndexOutcome::Skipped(SkipReason::EntityNotConfigured));
        }

        let mut options = QueryOptions::page(
            &params.tenant_id,
            params.organization_id.clone(),
            PageRequest::new(1, 1),
        );
        options
            .filters
            .insert("id".to_string(), Value::String(params.record_id.clone()));

        let page = self.query_engine.query(&params.entity_id, options).await?;
        let Some(record) = page.items.into_iter().next() else {
            debug!("Record not found");
            return Ok(IndexOutcome::Skipped(SkipReason::RecordNotFound));
        };

        let (_, custom_fields) = split_custom_fields(&record, &self.config.custom_field_prefixes);
        let index_params = IndexRecordParams::new(&params.entity_id, &params.tenant_id, record)
            .with_record_id(&params.record_id)
            .with_organization(params.organization_id.clone())
            .with_custom_fields(custom_fields)
            .for_backend(params.backend);

        self.index_record(&index_params).await
    }

    /// Remove one record from every strategy.
    #[instrument(skip(self, params), fields(entity_id = %params.entity_id, record_id = %params.record_id))]
    pub async fn delete_record(&self, params: &DeleteRecordParams) -> Result<(), ReindexError> {
        if !self.registry.is_enabled(&params.entity_id) {
            return Err(ReindexError::EntityNotConfigured(params.entity_id.clone()));
        }
        self.search_service
            .delete(&params.entity_id, &params.record_id, &params.tenant_id)
            .await?;
        Ok(())
    }

    /// Remove every record of an entity for a tenant from every strategy and
    /// zero the coverage of each purged backend.
    #[instrument(skip(self, params), fields(entity_id = %params.entity_id, tenant_id = %params.tenant_id))]
    pub async fn purge_entity(&self, params: &PurgeEntityParams) -> Result<(), ReindexError> {
        if !self.registry.is_enabled(&params.entity_id) {
            return Err(ReindexError::EntityNotConfigured(params.entity_id.clone()));
        }
        self.search_service
            .purge(&params.entity_id, &params.tenant_id)
            .await?;
        info!("Entity purged");

        for strategy in self.search_service.strategies() {
            if let Ok(backend) = strategy.id().parse::<BackendKind>() {
                self.reset_coverage(backend, &params.entity_id, &params.tenant_id)
                    .await;
            }
        }
        Ok(())
    }

    /// Index pre-built inputs in one bulk call.
    ///
    /// Only presenter, URL and link hooks run, and their failures are
    /// absorbed. Inputs of unknown entities or without an identifier are
    /// left out.
    #[instrument(skip(self, inputs), fields(inputs = inputs.len()))]
    pub async fn bulk_index_records(
        &self,
        inputs: &[IndexRecordParams],
    ) -> Result<BatchOperationSummary, ReindexError> {
        let mut records = Vec::with_capacity(inputs.len());

        for input in inputs {
            let Some(config) = self.registry.get(&input.entity_id) else {
                debug!(entity_id = %input.entity_id, "Entity not configured, leaving input out");
                continue;
            };
            let scope = RecordScope::new(&input.tenant_id, input.organization_id.as_deref());
            if let Some(record) = self
                .build_with(
                    config,
                    &input.record,
                    input.record_id.as_deref(),
                    scope,
                    Some(&input.custom_fields),
                    &self.query_engine,
                    BuildMode::BestEffort,
                )
                .await
            {
                records.push(record);
            }
        }

        if records.is_empty() {
            return Ok(BatchOperationSummary::default());
        }
        Ok(self.search_service.bulk_index(&records).await?)
    }

    async fn index_built(
        &self,
        record: &IndexableRecord,
        backend: Option<BackendKind>,
    ) -> Result<(), ReindexError> {
        match backend {
            Some(backend) => {
                self.strategy_for(backend)?.index(record).await?;
            }
            None => self.search_service.index(record).await?,
        }
        Ok(())
    }
}
