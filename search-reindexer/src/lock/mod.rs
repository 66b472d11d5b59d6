//! Cross-process reindex lock.
//!
//! One lock may be active per `(backend, tenant)`. A lock whose heartbeat is
//! older than the configured threshold is stale and may be reclaimed by the
//! next acquirer.
//!
//! An [`AcquiredLock`] ends through one of two protocols:
//!
//! - [`AcquiredLock::release`]: the caller did all the work itself and clears
//!   the lock on completion.
//! - [`AcquiredLock::hand_off`]: the work was queued; the lock stays in place,
//!   workers keep it fresh through heartbeats and it expires through
//!   staleness once they stop.
//!
//! Both act only on the lock this sweep acquired. If the lock went stale and
//! another sweep reclaimed it, heartbeats and release leave the new holder's
//! lock untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::errors::{ReindexError, ReindexLockConflict};
use search_reindexer_repository::{
    LockAcquireOutcome, LockProgress, ReindexLockStore, StoreError,
};
use search_reindexer_shared::{BackendKind, ReindexLock};

/// Lock timing configuration. The threshold has no default and must be set
/// by the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// A lock without a heartbeat for longer than this is stale.
    pub stale_after: Duration,
}

impl LockConfig {
    pub fn new(stale_after: Duration) -> Self {
        Self { stale_after }
    }
}

/// A lock as seen by a status check.
#[derive(Debug, Clone, PartialEq)]
pub struct ReindexLockStatus {
    pub lock: ReindexLock,
    /// Time since the lock was acquired.
    pub elapsed: Duration,
    /// Time since the last heartbeat.
    pub since_heartbeat: Duration,
    /// True once the lock may be reclaimed.
    pub stale: bool,
}

impl ReindexLockStatus {
    /// True while the lock still excludes other reindex operations.
    pub fn is_active(&self) -> bool {
        !self.stale
    }
}

/// Acquires, inspects and clears reindex locks.
#[derive(Clone)]
pub struct ReindexLockManager {
    store: Arc<dyn ReindexLockStore>,
    config: LockConfig,
}

impl ReindexLockManager {
    pub fn new(store: Arc<dyn ReindexLockStore>, config: LockConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> LockConfig {
        self.config
    }

    /// Acquire the lock of `(lock_type, tenant_id)`.
    ///
    /// Fails with [`ReindexError::LockConflict`] carrying the current holder
    /// when a fresh lock exists. A stale lock is replaced.
    pub async fn acquire(
        &self,
        lock_type: BackendKind,
        action: &str,
        tenant_id: &str,
        organization_id: Option<&str>,
    ) -> Result<AcquiredLock, ReindexError> {
        let now = Utc::now();
        let lock = ReindexLock::new(
            lock_type,
            action,
            tenant_id,
            organization_id.map(str::to_string),
            now,
        );

        match self
            .store
            .acquire(lock, now - self.config.stale_after)
            .await?
        {
            LockAcquireOutcome::Acquired(lock) => {
                info!(
                    lock_type = %lock_type,
                    tenant_id = %tenant_id,
                    action = %action,
                    "Reindex lock acquired"
                );
                Ok(AcquiredLock::new(self.store.clone(), lock))
            }
            LockAcquireOutcome::Held(existing) => {
                let elapsed = now - existing.started_at;
                warn!(
                    lock_type = %lock_type,
                    tenant_id = %tenant_id,
                    held_by = %existing.action,
                    processed = existing.processed_count,
                    total = existing.total_count,
                    elapsed_secs = elapsed.num_seconds(),
                    "Reindex lock already held"
                );
                Err(ReindexError::LockConflict(ReindexLockConflict {
                    lock: existing,
                    elapsed,
                }))
            }
        }
    }

    /// Current lock of `(lock_type, tenant_id)` with derived timings.
    pub async fn status(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
    ) -> Result<Option<ReindexLockStatus>, StoreError> {
        let now = Utc::now();
        Ok(self
            .store
            .get(lock_type, tenant_id)
            .await?
            .map(|lock| {
                let since_heartbeat = now - lock.heartbeat_at;
                ReindexLockStatus {
                    elapsed: now - lock.started_at,
                    stale: since_heartbeat > self.config.stale_after,
                    since_heartbeat,
                    lock,
                }
            }))
    }

    /// Remove the lock regardless of its holder. Returns false if none existed.
    pub async fn clear(&self, lock_type: BackendKind, tenant_id: &str) -> Result<bool, StoreError> {
        let cleared = self.store.clear(lock_type, tenant_id, None).await?;
        if cleared {
            info!(lock_type = %lock_type, tenant_id = %tenant_id, "Reindex lock cleared");
        }
        Ok(cleared)
    }

    /// Add `processed` to the lock's counter and refresh its heartbeat.
    ///
    /// Used by queue workers. Returns false if no lock exists.
    pub async fn touch(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
        processed: u64,
    ) -> Result<bool, StoreError> {
        self.store
            .heartbeat(
                lock_type,
                tenant_id,
                None,
                LockProgress::Increment { processed },
                Utc::now(),
            )
            .await
    }
}

/// A lock owned by the current sweep.
pub struct AcquiredLock {
    store: Arc<dyn ReindexLockStore>,
    lock: ReindexLock,
    processed: AtomicU64,
    total: AtomicU64,
}

impl AcquiredLock {
    fn new(store: Arc<dyn ReindexLockStore>, lock: ReindexLock) -> Self {
        Self {
            store,
            processed: AtomicU64::new(lock.processed_count),
            total: AtomicU64::new(lock.total_count),
            lock,
        }
    }

    /// The lock as it was written on acquisition.
    pub fn lock(&self) -> &ReindexLock {
        &self.lock
    }

    pub fn lock_type(&self) -> BackendKind {
        self.lock.lock_type
    }

    pub fn tenant_id(&self) -> &str {
        &self.lock.tenant_id
    }

    /// Counters as last reported: `(processed, total)`.
    pub fn progress(&self) -> (u64, u64) {
        (
            self.processed.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        )
    }

    /// Add to the counters and write them with a fresh heartbeat.
    ///
    /// Several partitions of one sweep may report through the same lock.
    pub async fn heartbeat(&self, processed_delta: u64, total_delta: u64) -> Result<(), StoreError> {
        let processed = self.processed.fetch_add(processed_delta, Ordering::Relaxed) + processed_delta;
        let total = self.total.fetch_add(total_delta, Ordering::Relaxed) + total_delta;

        let found = self
            .store
            .heartbeat(
                self.lock.lock_type,
                &self.lock.tenant_id,
                Some(self.lock.started_at),
                LockProgress::Absolute { processed, total },
                Utc::now(),
            )
            .await?;

        if !found {
            warn!(
                lock_type = %self.lock.lock_type,
                tenant_id = %self.lock.tenant_id,
                started_at = %self.lock.started_at,
                "Reindex lock no longer owned by this sweep"
            );
        }
        Ok(())
    }

    /// Synchronous completion: clear the lock if this sweep still owns it.
    pub async fn release(self) -> Result<(), StoreError> {
        let cleared = self
            .store
            .clear(
                self.lock.lock_type,
                &self.lock.tenant_id,
                Some(self.lock.started_at),
            )
            .await?;

        if cleared {
            debug!(
                lock_type = %self.lock.lock_type,
                tenant_id = %self.lock.tenant_id,
                "Reindex lock released"
            );
        } else {
            warn!(
                lock_type = %self.lock.lock_type,
                tenant_id = %self.lock.tenant_id,
                started_at = %self.lock.started_at,
                "Reindex lock no longer owned by this sweep, leaving it in place"
            );
        }
        Ok(())
    }

    /// Queued completion: leave the lock to worker heartbeats and staleness.
    pub fn hand_off(self) {
        let (processed, total) = self.progress();
        debug!(
            lock_type = %self.lock.lock_type,
            tenant_id = %self.lock.tenant_id,
            processed,
            total,
            "Reindex lock handed off to queue workers"
        );
    }
}
