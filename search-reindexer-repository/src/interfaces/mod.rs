//! Interface definitions for the collaborators of the reindexer.
//!
//! Every external system the reindexer talks to sits behind one of these
//! traits so implementations can be swapped and mocked in tests.

mod coverage_store;
mod job_queue;
mod lock_store;
mod query_engine;
mod search_service;
mod search_strategy;

pub use coverage_store::CoverageStore;
pub use job_queue::{JobQueue, QueuedJob};
pub use lock_store::{LockAcquireOutcome, LockProgress, ReindexLockStore};
pub use query_engine::{PageRequest, Partition, QueryEngine, QueryOptions, QueryPage};
pub use search_service::SearchService;
pub use search_strategy::SearchStrategy;
