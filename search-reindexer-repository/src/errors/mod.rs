//! Error types for the search reindexer repository.
//!
//! One error type per concern: search backends, record store queries, job
//! queues, and the lock/coverage stores.

mod query_error;
mod queue_error;
mod search_service_error;
mod store_error;

pub use query_error::QueryError;
pub use queue_error::QueueError;
pub use search_service_error::SearchServiceError;
pub use store_error::StoreError;
