//! # Search Reindexer Shared
//!
//! This crate defines shared data structures used across the search reindexing
//! pipeline: the backend-ready record, queue payloads, lock and coverage rows,
//! and the aggregate outcome of a reindex sweep.

pub mod types;

pub use types::coverage::CoverageCount;
pub use types::indexable_record::{IndexableRecord, Presenter, RecordFields, RecordLink, RecordText};
pub use types::job::{JobType, RecordRef, ReindexJob};
pub use types::lock::{BackendKind, ReindexLock};
pub use types::reindex::{ReindexErrorEntry, ReindexPhase, ReindexProgress, ReindexResult};
