//! OpenSearch implementation of the full-text search strategy.

mod index_config;
mod strategy;

pub use index_config::FulltextIndexConfig;
pub use strategy::OpenSearchStrategy;
