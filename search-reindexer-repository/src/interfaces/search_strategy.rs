//! Search strategy trait definition.
//!
//! A strategy is one pluggable search backend (full-text engine, vector store,
//! ...). Strategies are registered with a `SearchService` facade.

use async_trait::async_trait;

use crate::errors::SearchServiceError;
use crate::types::{BatchOperationResult, BatchOperationSummary, EntryQuery, IndexedEntry};
use search_reindexer_shared::IndexableRecord;

/// One search backend behind the uniform facade.
///
/// `recreate_index` is only meaningful for backends that support atomic index
/// recreation (full-text); `list_entries` only for backends that can enumerate
/// their rows (vector). Both default to `SearchServiceError::Unsupported`.
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    /// Stable identifier, e.g. `fulltext` or `vector`.
    fn id(&self) -> &str;

    /// Whether the backend can currently accept operations.
    async fn is_available(&self) -> bool;

    /// Index (upsert) one record.
    async fn index(&self, record: &IndexableRecord) -> Result<(), SearchServiceError>;

    /// Remove one record. Removing a missing record is not an error.
    async fn delete(
        &self,
        entity_id: &str,
        record_id: &str,
        tenant_id: &str,
    ) -> Result<(), SearchServiceError>;

    /// Remove every record of an entity type for a tenant.
    async fn purge(&self, entity_id: &str, tenant_id: &str) -> Result<(), SearchServiceError>;

    /// Index many records, reporting per-record outcomes.
    ///
    /// The default implementation indexes records one at a time.
    async fn bulk_index(
        &self,
        records: &[IndexableRecord],
    ) -> Result<BatchOperationSummary, SearchServiceError> {
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            match self.index(record).await {
                Ok(()) => results.push(BatchOperationResult::succeeded(
                    &record.entity_id,
                    &record.record_id,
                )),
                Err(e) => results.push(BatchOperationResult::failed(
                    &record.entity_id,
                    &record.record_id,
                    e,
                )),
            }
        }
        Ok(BatchOperationSummary::from_results(results))
    }

    /// Drop and recreate the tenant's destination index.
    async fn recreate_index(&self, _tenant_id: &str) -> Result<(), SearchServiceError> {
        Err(SearchServiceError::unsupported(self.id(), "recreate_index"))
    }

    /// List entries held by the backend for a scope.
    async fn list_entries(
        &self,
        _query: &EntryQuery,
    ) -> Result<Vec<IndexedEntry>, SearchServiceError> {
        Err(SearchServiceError::unsupported(self.id(), "list_entries"))
    }
}
