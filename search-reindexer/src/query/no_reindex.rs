//! Query engine decorator that never triggers automatic reindexing.

use std::sync::Arc;

use async_trait::async_trait;

use search_reindexer_repository::{QueryEngine, QueryError, QueryOptions, QueryPage};

/// Wraps a query engine and forces `skip_auto_reindex` on every query.
///
/// Hooks receive this wrapper instead of the raw engine, so a hook that reads
/// records cannot schedule more indexing while a record is being indexed.
#[derive(Clone)]
pub struct NoReindexQueryEngine {
    inner: Arc<dyn QueryEngine>,
}

impl NoReindexQueryEngine {
    pub fn new(inner: Arc<dyn QueryEngine>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl QueryEngine for NoReindexQueryEngine {
    async fn query(
        &self,
        entity_id: &str,
        mut options: QueryOptions,
    ) -> Result<QueryPage, QueryError> {
        options.skip_auto_reindex = true;
        self.inner.query(entity_id, options).await
    }
}
