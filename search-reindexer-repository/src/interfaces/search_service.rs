//! Search service facade trait definition.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::SearchServiceError;
use crate::interfaces::SearchStrategy;
use crate::types::BatchOperationSummary;
use search_reindexer_shared::IndexableRecord;

/// Facade over every configured search strategy.
///
/// The reindexer only talks to backends through this trait. `index`, `delete`,
/// `purge` and `bulk_index` address all strategies at once; `get_strategy`
/// gives access to one backend for backend-specific sweeps.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Index one record in every available strategy.
    async fn index(&self, record: &IndexableRecord) -> Result<(), SearchServiceError>;

    /// Index many records in every available strategy.
    async fn bulk_index(
        &self,
        records: &[IndexableRecord],
    ) -> Result<BatchOperationSummary, SearchServiceError>;

    /// Remove one record from every available strategy.
    async fn delete(
        &self,
        entity_id: &str,
        record_id: &str,
        tenant_id: &str,
    ) -> Result<(), SearchServiceError>;

    /// Remove all records of an entity type for a tenant from every available strategy.
    async fn purge(&self, entity_id: &str, tenant_id: &str) -> Result<(), SearchServiceError>;

    /// Look up a strategy by its identifier.
    fn get_strategy(&self, id: &str) -> Option<Arc<dyn SearchStrategy>>;

    /// All registered strategies.
    fn strategies(&self) -> Vec<Arc<dyn SearchStrategy>>;
}
