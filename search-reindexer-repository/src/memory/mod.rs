//! In-process implementations of the lock, coverage and queue contracts.
//!
//! Suitable for single-process deployments and tests. State lives behind a
//! `tokio::sync::Mutex`, which gives the same atomicity the PostgreSQL stores
//! get from their upsert statements.

mod coverage_store;
mod job_queue;
mod lock_store;

pub use coverage_store::InMemoryCoverageStore;
pub use job_queue::InMemoryJobQueue;
pub use lock_store::InMemoryReindexLockStore;
