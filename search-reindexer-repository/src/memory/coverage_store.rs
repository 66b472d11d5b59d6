//! In-memory coverage store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::StoreError;
use crate::interfaces::CoverageStore;
use search_reindexer_shared::{BackendKind, CoverageCount};

type ScopeKey = (BackendKind, String, String, Option<String>);

/// Coverage store keeping one row per scope in a map.
#[derive(Default)]
pub struct InMemoryCoverageStore {
    rows: Mutex<HashMap<ScopeKey, CoverageCount>>,
}

impl InMemoryCoverageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(count: &CoverageCount) -> ScopeKey {
        (
            count.backend,
            count.entity_type.clone(),
            count.tenant_id.clone(),
            count.organization_id.clone(),
        )
    }
}

#[async_trait]
impl CoverageStore for InMemoryCoverageStore {
    async fn upsert_counts(&self, counts: &[CoverageCount]) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        for count in counts {
            rows.insert(Self::key(count), count.clone());
        }
        Ok(())
    }

    async fn get_count(
        &self,
        backend: BackendKind,
        entity_type: &str,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> Result<Option<CoverageCount>, StoreError> {
        let rows = self.rows.lock().await;
        let key = (
            backend,
            entity_type.to_string(),
            tenant_id.to_string(),
            organization_id.map(str::to_string),
        );
        Ok(rows.get(&key).cloned())
    }

    async fn organization_scopes(
        &self,
        backend: BackendKind,
        entity_type: &str,
        tenant_id: &str,
    ) -> Result<Vec<Option<String>>, StoreError> {
        let rows = self.rows.lock().await;
        let mut scopes: Vec<Option<String>> = rows
            .keys()
            .filter(|(b, e, t, _)| *b == backend && e == entity_type && t == tenant_id)
            .map(|(_, _, _, org)| org.clone())
            .collect();
        scopes.sort();
        Ok(scopes)
    }
}
