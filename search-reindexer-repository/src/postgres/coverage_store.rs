//! PostgreSQL coverage store.

use async_trait::async_trait;
use sqlx::FromRow;

use super::{from_db_count, to_db_count};
use crate::errors::StoreError;
use crate::interfaces::CoverageStore;
use search_reindexer_shared::{BackendKind, CoverageCount};

#[derive(FromRow)]
struct CoverageRow {
    backend: String,
    entity_type: String,
    tenant_id: String,
    organization_id: Option<String>,
    indexed_count: i64,
    with_deleted: bool,
}

impl TryFrom<CoverageRow> for CoverageCount {
    type Error = StoreError;

    fn try_from(row: CoverageRow) -> Result<Self, Self::Error> {
        Ok(CoverageCount {
            backend: row
                .backend
                .parse::<BackendKind>()
                .map_err(StoreError::invalid_row)?,
            entity_type: row.entity_type,
            tenant_id: row.tenant_id,
            organization_id: row.organization_id,
            indexed_count: from_db_count(row.indexed_count)?,
            with_deleted: row.with_deleted,
        })
    }
}

/// PostgreSQL-backed coverage store.
///
/// Rows are unique per `(backend, entity_type, tenant_id, organization_id)`
/// with a NULL organization treated as its own scope.
pub struct PostgresCoverageStore {
    pool: sqlx::PgPool,
}

impl PostgresCoverageStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CoverageStore for PostgresCoverageStore {
    async fn upsert_counts(&self, counts: &[CoverageCount]) -> Result<(), StoreError> {
        if counts.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for count in counts {
            sqlx::query(
                "INSERT INTO search_coverage \
                    (backend, entity_type, tenant_id, organization_id, indexed_count, with_deleted, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
                 ON CONFLICT (backend, entity_type, tenant_id, (COALESCE(organization_id, ''))) DO UPDATE SET \
                    indexed_count = EXCLUDED.indexed_count, \
                    with_deleted = EXCLUDED.with_deleted, \
                    updated_at = NOW()",
            )
            .bind(count.backend.as_str())
            .bind(&count.entity_type)
            .bind(&count.tenant_id)
            .bind(&count.organization_id)
            .bind(to_db_count(count.indexed_count)?)
            .bind(count.with_deleted)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn get_count(
        &self,
        backend: BackendKind,
        entity_type: &str,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> Result<Option<CoverageCount>, StoreError> {
        let row: Option<CoverageRow> = sqlx::query_as(
            "SELECT backend, entity_type, tenant_id, organization_id, indexed_count, with_deleted \
             FROM search_coverage \
             WHERE backend = $1 AND entity_type = $2 AND tenant_id = $3 \
               AND organization_id IS NOT DISTINCT FROM $4",
        )
        .bind(backend.as_str())
        .bind(entity_type)
        .bind(tenant_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CoverageCount::try_from).transpose()
    }

    async fn organization_scopes(
        &self,
        backend: BackendKind,
        entity_type: &str,
        tenant_id: &str,
    ) -> Result<Vec<Option<String>>, StoreError> {
        let scopes: Vec<(Option<String>,)> = sqlx::query_as(
            "SELECT organization_id FROM search_coverage \
             WHERE backend = $1 AND entity_type = $2 AND tenant_id = $3 \
             ORDER BY organization_id NULLS FIRST",
        )
        .bind(backend.as_str())
        .bind(entity_type)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(scopes.into_iter().map(|(org,)| org).collect())
    }
}
