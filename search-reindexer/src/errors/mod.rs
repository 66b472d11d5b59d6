//! Error types for the search reindexer.

use std::fmt;

use chrono::Duration;
use thiserror::Error;

use search_reindexer_repository::{QueryError, QueueError, SearchServiceError, StoreError};
use search_reindexer_shared::{BackendKind, ReindexLock};

/// Failure raised by an entity hook.
///
/// Hook failures never abort record building: the failing hook's contribution
/// is treated as absent.
#[derive(Error, Debug, Clone)]
pub enum HookError {
    /// The hook reported a failure.
    #[error("Hook failed: {0}")]
    Failed(String),

    /// A query issued from inside the hook failed.
    #[error("Hook query failed: {0}")]
    Query(#[from] QueryError),
}

impl HookError {
    /// Create a hook failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Payload returned when a reindex lock is already held.
#[derive(Debug, Clone, PartialEq)]
pub struct ReindexLockConflict {
    /// The lock currently held, unmodified.
    pub lock: ReindexLock,
    /// Time since the holder started.
    pub elapsed: Duration,
}

impl fmt::Display for ReindexLockConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reindex '{}' already running for tenant {} ({} of {} processed, started {}s ago)",
            self.lock.lock_type,
            self.lock.action,
            self.lock.tenant_id,
            self.lock.processed_count,
            self.lock.total_count,
            self.elapsed.num_seconds()
        )
    }
}

/// Errors that can occur while reindexing.
///
/// Sweeps fold configuration problems and per-page failures into their
/// `ReindexResult`; these values surface lock conflicts and unexpected
/// failures of the collaborators.
#[derive(Error, Debug)]
pub enum ReindexError {
    /// The entity is unknown or disabled.
    #[error("Entity not configured for indexing: {0}")]
    EntityNotConfigured(String),

    /// The targeted backend strategy is missing or unavailable.
    #[error("Search strategy '{0}' is not available")]
    StrategyUnavailable(BackendKind),

    /// Queue dispatch was requested but no queue is bound for the backend.
    #[error("No queue configured for {0} indexing")]
    QueueNotConfigured(BackendKind),

    /// An optional collaborator the operation needs was not configured.
    #[error("No {0} configured")]
    MissingComponent(&'static str),

    /// Another reindex of the same kind holds the tenant's lock.
    #[error("Reindex lock conflict: {0}")]
    LockConflict(ReindexLockConflict),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Search service error: {0}")]
    Search(#[from] SearchServiceError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ReindexError {
    /// Returns the conflict payload if this is a lock conflict.
    pub fn as_lock_conflict(&self) -> Option<&ReindexLockConflict> {
        match self {
            Self::LockConflict(conflict) => Some(conflict),
            _ => None,
        }
    }
}
