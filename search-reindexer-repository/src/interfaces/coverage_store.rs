//! Persistence contract for coverage counts.

use async_trait::async_trait;

use crate::errors::StoreError;
use search_reindexer_shared::{BackendKind, CoverageCount};

/// Storage of one coverage row per `(backend, entity, tenant, organization-or-null)`.
#[async_trait]
pub trait CoverageStore: Send + Sync {
    /// Insert or overwrite the given rows atomically.
    async fn upsert_counts(&self, counts: &[CoverageCount]) -> Result<(), StoreError>;

    /// Read one scope's row.
    async fn get_count(
        &self,
        backend: BackendKind,
        entity_type: &str,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> Result<Option<CoverageCount>, StoreError>;

    /// Organization scopes (including the tenant-wide `None` scope) that have a row.
    async fn organization_scopes(
        &self,
        backend: BackendKind,
        entity_type: &str,
        tenant_id: &str,
    ) -> Result<Vec<Option<String>>, StoreError>;
}
