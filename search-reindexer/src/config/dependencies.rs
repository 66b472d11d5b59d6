//! Dependency initialization and wiring for the search reindexer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::time::sleep;
use tracing::{info, warn};

use super::ReindexerConfig;
use crate::coverage::CoverageTracker;
use crate::indexer::SearchIndexer;
use crate::lock::ReindexLockManager;
use crate::queue::QueueDispatcher;
use crate::registry::EntityConfigRegistry;
use crate::IndexingError;
use search_reindexer_repository::{
    run_migrations, FulltextIndexConfig, OpenSearchStrategy, PostgresCoverageStore,
    PostgresReindexLockStore, QueryEngine, SearchService, SearchStrategy, StrategySearchService,
};

/// Connection mode for PostgreSQL and OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection at the configured interval until it succeeds.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if not set or invalid.
    pub fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("retry").to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid DATABASE_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Container for the initialized stateful dependencies.
pub struct Dependencies {
    pub config: ReindexerConfig,
    pub pool: PgPool,
    pub lock_manager: ReindexLockManager,
    pub coverage: CoverageTracker,
}

impl Dependencies {
    /// Connect to PostgreSQL, apply migrations and build the lock and
    /// coverage components.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails (only in fail-fast mode
    ///   for connection errors)
    pub async fn new(config: ReindexerConfig) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %config.opensearch_url,
            database_max_connections = config.database_max_connections,
            connection_mode = ?config.connection_mode,
            retry_interval_secs = config.retry_interval.as_secs(),
            lock_stale_secs = config.lock_stale_after.num_seconds(),
            "Initializing dependencies"
        );

        let url = config.database_url.clone();
        let max_connections = config.database_max_connections;
        let pool = connect_with_retry(
            "PostgreSQL",
            config.connection_mode,
            config.retry_interval,
            || Self::try_connect_database(&url, max_connections),
        )
        .await?;
        info!("PostgreSQL connection established");

        run_migrations(&pool).await?;

        let lock_manager = ReindexLockManager::new(
            Arc::new(PostgresReindexLockStore::new(pool.clone())),
            config.lock_config(),
        );
        let coverage = CoverageTracker::new(Arc::new(PostgresCoverageStore::new(pool.clone())));

        Ok(Self {
            config,
            pool,
            lock_manager,
            coverage,
        })
    }

    /// Connect the OpenSearch strategy and wrap it in the search facade.
    ///
    /// Further strategies (e.g. a vector store) are appended by the caller
    /// through `extra_strategies`.
    pub async fn connect_search_service(
        &self,
        extra_strategies: Vec<Arc<dyn SearchStrategy>>,
    ) -> Result<Arc<StrategySearchService>, IndexingError> {
        let url = self.config.opensearch_url.clone();
        let index_config = FulltextIndexConfig::new(&self.config.fulltext_index_prefix);

        let fulltext = connect_with_retry(
            "OpenSearch",
            self.config.connection_mode,
            self.config.retry_interval,
            || Self::try_connect_opensearch(&url, index_config.clone()),
        )
        .await?;
        info!("OpenSearch connection established");

        let mut strategies: Vec<Arc<dyn SearchStrategy>> = vec![Arc::new(fulltext)];
        strategies.extend(extra_strategies);
        Ok(Arc::new(StrategySearchService::new(strategies)))
    }

    /// Assemble an indexer on top of these dependencies.
    pub fn build_indexer(
        &self,
        registry: EntityConfigRegistry,
        query_engine: Arc<dyn QueryEngine>,
        search_service: Arc<dyn SearchService>,
        dispatcher: QueueDispatcher,
    ) -> SearchIndexer {
        SearchIndexer::new(registry, query_engine, search_service)
            .with_config(self.config.indexer_config())
            .with_queue_dispatcher(dispatcher)
            .with_lock_manager(self.lock_manager.clone())
            .with_coverage_tracker(self.coverage.clone())
    }

    async fn try_connect_database(url: &str, max_connections: u32) -> Result<PgPool, IndexingError> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| IndexingError::config(format!("Failed to connect to PostgreSQL: {}", e)))
    }

    async fn try_connect_opensearch(
        url: &str,
        index_config: FulltextIndexConfig,
    ) -> Result<OpenSearchStrategy, IndexingError> {
        OpenSearchStrategy::new(url, index_config)
            .await
            .map_err(|e| {
                IndexingError::config(format!("Failed to create OpenSearch strategy: {}", e))
            })
    }
}

/// Run `connect` until it succeeds, or once in fail-fast mode.
async fn connect_with_retry<T, F, Fut>(
    target: &str,
    mode: ConnectionMode,
    retry_interval: Duration,
    connect: F,
) -> Result<T, IndexingError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, IndexingError>>,
{
    loop {
        match connect().await {
            Ok(connection) => return Ok(connection),
            Err(e) => match mode {
                ConnectionMode::FailFast => return Err(e),
                ConnectionMode::Retry => {
                    warn!(
                        target_service = %target,
                        error = %e,
                        retry_interval_secs = retry_interval.as_secs(),
                        "Connection failed, retrying..."
                    );
                    sleep(retry_interval).await;
                }
            },
        }
    }
}
