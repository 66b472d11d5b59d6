//! # Search Reindexer Repository
//!
//! This crate provides the contracts the reindexer talks to and their
//! implementations: the record query engine, search strategies and the
//! fan-out search service, job queues, and the lock and coverage stores.
//! It ships an OpenSearch strategy, PostgreSQL stores and in-memory
//! counterparts for single-process use.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod postgres;
pub mod service;
pub mod types;

pub use config::SearchServiceConfig;
pub use errors::{QueryError, QueueError, SearchServiceError, StoreError};
pub use interfaces::{
    CoverageStore, JobQueue, LockAcquireOutcome, LockProgress, PageRequest, Partition,
    QueryEngine, QueryOptions, QueryPage, QueuedJob, ReindexLockStore, SearchService,
    SearchStrategy,
};
pub use memory::{InMemoryCoverageStore, InMemoryJobQueue, InMemoryReindexLockStore};
pub use opensearch::{FulltextIndexConfig, OpenSearchStrategy};
pub use postgres::{run_migrations, PostgresCoverageStore, PostgresReindexLockStore};
pub use service::StrategySearchService;
pub use types::{BatchOperationResult, BatchOperationSummary, EntryQuery, IndexedEntry};
