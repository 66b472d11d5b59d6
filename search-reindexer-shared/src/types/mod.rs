//! Core data structures shared by the reindexer crates.

pub mod coverage;
pub mod indexable_record;
pub mod job;
pub mod lock;
pub mod reindex;
