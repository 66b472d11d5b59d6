//! # Search Reindexer
//!
//! Keeps the search backends (full-text and vector) consistent with the
//! source-of-truth record store.
//!
//! ## Architecture
//!
//! 1. **Registry**: Which entity types are indexable and the hooks that turn
//!    their raw records into searchable content
//! 2. **Indexer**: Builds indexable records and runs single-record operations
//!    and paginated reindex sweeps
//! 3. **Lock**: Per-tenant, per-backend exclusion of concurrent sweeps with
//!    heartbeat-based staleness
//! 4. **Coverage**: Per-scope counts of records held by each backend
//! 5. **Queue**: Dispatch of record batches to worker queues and the worker
//!    that drains them
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`registry`]: Entity configuration registry and hooks
//! - [`indexer`]: The search indexer
//! - [`lock`]: Reindex lock management
//! - [`coverage`]: Coverage tracking
//! - [`queue`]: Queue dispatch and worker
//! - [`query`]: Query engine adapters
//! - [`errors`]: Error types for the reindexer

pub mod config;
pub mod coverage;
pub mod errors;
pub mod indexer;
pub mod lock;
pub mod query;
pub mod queue;
pub mod registry;

pub use config::{ConnectionMode, Dependencies, ReindexerConfig};
pub use coverage::CoverageTracker;
pub use errors::{HookError, ReindexError, ReindexLockConflict};
pub use indexer::{
    BackendReindexParams, DeleteRecordParams, IndexByIdParams, IndexOutcome, IndexRecordParams,
    IndexerConfig, ProgressCallback, PurgeEntityParams, RecordScope, ReindexParams,
    SearchIndexer, SkipReason,
};
pub use lock::{AcquiredLock, LockConfig, ReindexLockManager, ReindexLockStatus};
pub use query::NoReindexQueryEngine;
pub use queue::{
    QueueDispatcher, ReindexWorker, WorkerConfig, WorkerStats, FULLTEXT_QUEUE, VECTOR_QUEUE,
};
pub use registry::{
    EntityConfig, EntityConfigRegistry, EntityHooks, Hook, HookContext, HookFuture, ModuleConfig,
    SourceContribution,
};

use search_reindexer_repository::StoreError;
use thiserror::Error;

/// Errors that can occur during reindexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Persistence error from the lock or coverage store.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Reindex error.
    #[error("Reindex error: {0}")]
    ReindexError(#[from] ReindexError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
