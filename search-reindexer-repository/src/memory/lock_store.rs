//! In-memory reindex lock store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::errors::StoreError;
use crate::interfaces::{LockAcquireOutcome, LockProgress, ReindexLockStore};
use search_reindexer_shared::{BackendKind, ReindexLock};

/// Lock store keeping one lock per `(lock_type, tenant_id)` in a map.
#[derive(Default)]
pub struct InMemoryReindexLockStore {
    locks: Mutex<HashMap<(BackendKind, String), ReindexLock>>,
}

impl InMemoryReindexLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReindexLockStore for InMemoryReindexLockStore {
    async fn acquire(
        &self,
        lock: ReindexLock,
        stale_before: DateTime<Utc>,
    ) -> Result<LockAcquireOutcome, StoreError> {
        let mut locks = self.locks.lock().await;
        let key = (lock.lock_type, lock.tenant_id.clone());

        if let Some(existing) = locks.get(&key) {
            if existing.heartbeat_at >= stale_before {
                return Ok(LockAcquireOutcome::Held(existing.clone()));
            }
        }

        locks.insert(key, lock.clone());
        Ok(LockAcquireOutcome::Acquired(lock))
    }

    async fn get(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
    ) -> Result<Option<ReindexLock>, StoreError> {
        let locks = self.locks.lock().await;
        Ok(locks.get(&(lock_type, tenant_id.to_string())).cloned())
    }

    async fn heartbeat(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
        started_at: Option<DateTime<Utc>>,
        progress: LockProgress,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut locks = self.locks.lock().await;
        let Some(lock) = locks.get_mut(&(lock_type, tenant_id.to_string())) else {
            return Ok(false);
        };
        if !is_owner(lock, started_at) {
            return Ok(false);
        }

        match progress {
            LockProgress::Absolute { processed, total } => {
                lock.processed_count = processed;
                lock.total_count = total;
            }
            LockProgress::Increment { processed } => {
                lock.processed_count += processed;
            }
        }
        lock.heartbeat_at = now;
        Ok(true)
    }

    async fn clear(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let mut locks = self.locks.lock().await;
        let key = (lock_type, tenant_id.to_string());
        match locks.get(&key) {
            Some(lock) if is_owner(lock, started_at) => {
                locks.remove(&key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn is_owner(lock: &ReindexLock, started_at: Option<DateTime<Utc>>) -> bool {
    started_at.map_or(true, |started_at| lock.started_at == started_at)
}
