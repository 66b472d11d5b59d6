//! Persistence contract for reindex locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::StoreError;
use search_reindexer_shared::{BackendKind, ReindexLock};

/// Outcome of an atomic acquire attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LockAcquireOutcome {
    /// The lock was written and now belongs to the caller.
    Acquired(ReindexLock),
    /// A fresh lock already exists; it is returned unmodified.
    Held(ReindexLock),
}

/// Progress reported through a heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockProgress {
    /// Overwrite the counters (the dispatcher knows the totals).
    Absolute { processed: u64, total: u64 },
    /// Add to the processed counter (workers report their own batches).
    Increment { processed: u64 },
}

/// Storage of one lock row per `(lock_type, tenant_id)`.
///
/// Implementations must make `acquire` atomic: of several concurrent callers
/// targeting the same key, at most one may observe `Acquired`.
///
/// `heartbeat` and `clear` take an optional `started_at`. When given, only a
/// lock acquired at exactly that instant is touched, so a sweep whose lock
/// was reclaimed cannot write to or delete its successor's lock. `None`
/// matches whichever lock holds the key.
#[async_trait]
pub trait ReindexLockStore: Send + Sync {
    /// Write `lock` unless a lock for the same key with a heartbeat at or after
    /// `stale_before` exists.
    async fn acquire(
        &self,
        lock: ReindexLock,
        stale_before: DateTime<Utc>,
    ) -> Result<LockAcquireOutcome, StoreError>;

    /// Read the current lock for a key.
    async fn get(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
    ) -> Result<Option<ReindexLock>, StoreError>;

    /// Update progress and refresh `heartbeat_at`. Returns false if no
    /// matching lock exists.
    async fn heartbeat(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
        started_at: Option<DateTime<Utc>>,
        progress: LockProgress,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Delete the lock for a key. Returns false if no matching lock existed.
    async fn clear(
        &self,
        lock_type: BackendKind,
        tenant_id: &str,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError>;
}
