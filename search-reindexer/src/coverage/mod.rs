//! Coverage tracking.
//!
//! Keeps, per `(backend, entity, tenant, organization-or-null)` scope, the
//! number of records a backend holds, so readers can tell a partially indexed
//! scope from a complete one.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::errors::ReindexError;
use search_reindexer_repository::{CoverageStore, EntryQuery, SearchStrategy, StoreError};
use search_reindexer_shared::{BackendKind, CoverageCount};

/// Page size used when counting vector entries.
const LIST_ENTRIES_PAGE_SIZE: usize = 1000;

/// Writes and reads coverage counts.
#[derive(Clone)]
pub struct CoverageTracker {
    store: Arc<dyn CoverageStore>,
}

impl CoverageTracker {
    pub fn new(store: Arc<dyn CoverageStore>) -> Self {
        Self { store }
    }

    /// Upsert the given rows. Writing the same rows twice is a no-op.
    pub async fn write_coverage_counts(&self, counts: &[CoverageCount]) -> Result<(), StoreError> {
        self.store.upsert_counts(counts).await
    }

    /// Write the count of one scope.
    pub async fn write_count(
        &self,
        backend: BackendKind,
        entity_type: &str,
        tenant_id: &str,
        organization_id: Option<&str>,
        indexed_count: u64,
    ) -> Result<(), StoreError> {
        debug!(
            backend = %backend,
            entity_type = %entity_type,
            tenant_id = %tenant_id,
            organization_id = ?organization_id,
            indexed_count,
            "Writing coverage count"
        );
        self.store
            .upsert_counts(&[CoverageCount::new(
                backend,
                entity_type,
                tenant_id,
                organization_id.map(str::to_string),
                indexed_count,
            )])
            .await
    }

    pub async fn get_count(
        &self,
        backend: BackendKind,
        entity_type: &str,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> Result<Option<CoverageCount>, StoreError> {
        self.store
            .get_count(backend, entity_type, tenant_id, organization_id)
            .await
    }

    /// Reset every known organization scope of the entity, plus the tenant-wide
    /// scope, to zero.
    #[instrument(skip(self))]
    pub async fn reset_after_purge(
        &self,
        backend: BackendKind,
        entity_type: &str,
        tenant_id: &str,
    ) -> Result<(), StoreError> {
        let mut scopes: BTreeSet<Option<String>> = self
            .store
            .organization_scopes(backend, entity_type, tenant_id)
            .await?
            .into_iter()
            .collect();
        scopes.insert(None);

        let counts: Vec<CoverageCount> = scopes
            .into_iter()
            .map(|org| CoverageCount::zero(backend, entity_type, tenant_id, org))
            .collect();

        debug!(scopes = counts.len(), "Resetting coverage after purge");
        self.store.upsert_counts(&counts).await
    }

    /// Recount a scope from the entries the vector backend actually holds.
    #[instrument(skip(self, strategy), fields(strategy = %strategy.id()))]
    pub async fn refresh_vector_coverage(
        &self,
        strategy: &dyn SearchStrategy,
        entity_type: &str,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> Result<u64, ReindexError> {
        let mut count: u64 = 0;
        let mut offset = 0;

        loop {
            let entries = strategy
                .list_entries(&EntryQuery {
                    entity_id: entity_type.to_string(),
                    tenant_id: tenant_id.to_string(),
                    organization_id: organization_id.map(str::to_string),
                    limit: LIST_ENTRIES_PAGE_SIZE,
                    offset,
                })
                .await?;

            count += entries.len() as u64;
            if entries.len() < LIST_ENTRIES_PAGE_SIZE {
                break;
            }
            offset += entries.len();
        }

        self.write_count(
            BackendKind::Vector,
            entity_type,
            tenant_id,
            organization_id,
            count,
        )
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use search_reindexer_repository::{IndexedEntry, InMemoryCoverageStore, SearchServiceError};
    use search_reindexer_shared::IndexableRecord;

    struct ListingStrategy {
        entries: usize,
    }

    #[async_trait]
    impl SearchStrategy for ListingStrategy {
        fn id(&self) -> &str {
            "vector"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn index(&self, _record: &IndexableRecord) -> Result<(), SearchServiceError> {
            Ok(())
        }

        async fn delete(&self, _: &str, _: &str, _: &str) -> Result<(), SearchServiceError> {
            Ok(())
        }

        async fn purge(&self, _: &str, _: &str) -> Result<(), SearchServiceError> {
            Ok(())
        }

        async fn list_entries(
            &self,
            query: &EntryQuery,
        ) -> Result<Vec<IndexedEntry>, SearchServiceError> {
            let end = (query.offset + query.limit).min(self.entries);
            Ok((query.offset..end)
                .map(|i| IndexedEntry {
                    entity_id: query.entity_id.clone(),
                    record_id: i.to_string(),
                    organization_id: query.organization_id.clone(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_reset_after_purge_zeroes_every_scope() {
        let store = Arc::new(InMemoryCoverageStore::new());
        let tracker = CoverageTracker::new(store.clone());

        tracker
            .write_count(BackendKind::Fulltext, "catalog:item", "t1", Some("o1"), 12)
            .await
            .unwrap();
        tracker
            .write_count(BackendKind::Fulltext, "catalog:item", "t1", Some("o2"), 7)
            .await
            .unwrap();
        tracker
            .write_count(BackendKind::Vector, "catalog:item", "t1", Some("o1"), 9)
            .await
            .unwrap();

        tracker
            .reset_after_purge(BackendKind::Fulltext, "catalog:item", "t1")
            .await
            .unwrap();

        for org in [None, Some("o1"), Some("o2")] {
            let row = tracker
                .get_count(BackendKind::Fulltext, "catalog:item", "t1", org)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(row.indexed_count, 0, "scope {:?}", org);
        }

        let vector = tracker
            .get_count(BackendKind::Vector, "catalog:item", "t1", Some("o1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(vector.indexed_count, 9);
    }

    #[tokio::test]
    async fn test_refresh_vector_coverage_counts_all_pages() {
        let tracker = CoverageTracker::new(Arc::new(InMemoryCoverageStore::new()));
        let strategy = ListingStrategy { entries: 2345 };

        let count = tracker
            .refresh_vector_coverage(&strategy, "crm:person", "t1", None)
            .await
            .unwrap();
        assert_eq!(count, 2345);

        let row = tracker
            .get_count(BackendKind::Vector, "crm:person", "t1", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.indexed_count, 2345);
    }
}
