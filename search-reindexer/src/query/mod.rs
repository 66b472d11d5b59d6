//! Query engine adapters used by the indexer.

mod no_reindex;

pub use no_reindex::NoReindexQueryEngine;
