//! PostgreSQL reindex lock store.
//!
//! Locks live in `search_reindex_locks`, keyed by `(lock_type, tenant_id)`.
//! Acquisition is a single upsert that only overwrites a stale row, so two
//! processes racing for the same key cannot both win.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::{from_db_count, to_db_count};
use crate::errors::StoreError;
use crate::interfaces::{LockAcquireOutcome, LockProgress, ReindexLockStore};
use search_reindexer_shared::{BackendKind, ReindexLock};

/// Attempts before giving up when a lock vanishes between upsert and read.
const ACQUIRE_ATTEMPTS: usize = 3;

#[derive(FromRow)]
struct LockRow {
    lock_type: String,
    action: String,
    tenant_id: String,
    organization_id: Option<String>,
    started_at: DateTime<Utc>,
    heartbeat_at: DateTime<Utc>,
    processed_count: i64,
    total_count: i64,
}

impl TryFrom<LockRow> for ReindexLock {
    type Error = StoreError;

    fn try_from(row: LockRow) -> Result<Self, Self::Error> {
        let lock_type = row
            .lock_type
            .parse::<BackendKind>()
            .map_err(StoreError::invalid_row)?;

        Ok(ReindexLock {
            lock_type,
            action: row.action,
            tenant_id: row.tenant_id,
            organization_id: row.organization_id,
            started_at: row.started_at,
            heartbeat_at: row.heartbeat_at,
            processed_count: from_db_count(row.processed_count)?,
            total_count: from_db_count(row.total_count)?,
        })
    }
}

/// PostgreSQL-backed lock store.
pub struct PostgresReindexLockStore {
    pool: sqlx::PgPool,
}

impl PostgresReindexLockStore {
    /// Creates a lock store on a pool whose schema has been migrated.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReindexLockStore for PostgresReindexLockStore {
    async fn acquire(
        &self,
        lock: ReindexLock,
        stale_before: DateTime<Utc>,
    ) -> Result<LockAcquireOutcome, StoreError> {
        for _ in 0..ACQUIRE_ATTEMPTS {
            let written: Option<LockRow> = sqlx::query_as(
                "INSERT INTO search_reindex_locks \
                    (lock_type, tenant_id, action, organization_id, started_at, heartbeat_at, processed_count, total_count) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 ON CONFLICT (lock_type, tenant_id) DO UPDATE SET \
                    action = EXCLUDED.action, \
                    organization_id = EXCLUDED.organization_id, \
                    started_at = EXCLUDED.started_at, \
                    heartbeat_at = EXCLUDED.heartbeat_at, \
                    processed_count = EXCLUDED.processed_count, \
                    total_count = EXCLUDED.total_count \
                 WHERE search_reindex_locks.heartbeat_at < $9 \
                 RETURNING lock_type, action, tenant_id, organization_id, started_at, heartbeat_at, processed_count, total_count",
            )
            .bind(lock.lock_type.as_str())
            .bind(&lock.tenant_id)
            .bind(&lock.action)
            .bind(&lock.organization_id)
            .bind(lock.started_at)
            .bind(lock.heartbeat_at)
            .bind(to_db_count(lock.processed_count)?)
            .bind(to_db_count(lock.total_count)?)
            .bind(stale_before)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = written {
                return Ok(LockAcquireOutcome::Acquired(row.try_into()?));
            }

            if let Some(existing) = self.get(lock.lock_type, &lock.tenant_id).await? {
                return Ok(LockAcquireOutcome::Held(existing));
            }
        }

        Err(StoreError::invalid_row(format!(
            "lock {}/{} changed concurrently during acquire",
            lock.lock_type, lock.tenant_id
        )))
    }

    async fn get(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
    ) -> Result<Option<ReindexLock>, StoreError> {
        let row: Option<LockRow> = sqlx::query_as(
            "SELECT lock_type, action, tenant_id, organization_id, started_at, heartbeat_at, processed_count, total_count \
             FROM search_reindex_locks WHERE lock_type = $1 AND tenant_id = $2",
        )
        .bind(lock_type.as_str())
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReindexLock::try_from).transpose()
    }

    async fn heartbeat(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
        started_at: Option<DateTime<Utc>>,
        progress: LockProgress,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = match progress {
            LockProgress::Absolute { processed, total } => {
                sqlx::query(
                    "UPDATE search_reindex_locks \
                     SET processed_count = $4, total_count = $5, heartbeat_at = $6 \
                     WHERE lock_type = $1 AND tenant_id = $2 \
                       AND ($3::timestamptz IS NULL OR started_at = $3)",
                )
                .bind(lock_type.as_str())
                .bind(tenant_id)
                .bind(started_at)
                .bind(to_db_count(processed)?)
                .bind(to_db_count(total)?)
                .bind(now)
                .execute(&self.pool)
                .await?
            }
            LockProgress::Increment { processed } => {
                sqlx::query(
                    "UPDATE search_reindex_locks \
                     SET processed_count = processed_count + $4, heartbeat_at = $5 \
                     WHERE lock_type = $1 AND tenant_id = $2 \
                       AND ($3::timestamptz IS NULL OR started_at = $3)",
                )
                .bind(lock_type.as_str())
                .bind(tenant_id)
                .bind(started_at)
                .bind(to_db_count(processed)?)
                .bind(now)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    async fn clear(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM search_reindex_locks \
             WHERE lock_type = $1 AND tenant_id = $2 \
               AND ($3::timestamptz IS NULL OR started_at = $3)",
        )
        .bind(lock_type.as_str())
        .bind(tenant_id)
        .bind(started_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
