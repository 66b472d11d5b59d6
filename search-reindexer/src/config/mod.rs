//! Environment configuration and dependency wiring.

mod dependencies;

pub use dependencies::{ConnectionMode, Dependencies};

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::indexer::{IndexerConfig, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use crate::lock::LockConfig;
use crate::IndexingError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default prefix of the per-tenant full-text indexes.
const DEFAULT_FULLTEXT_INDEX_PREFIX: &str = "search";

/// Default size of the PostgreSQL pool.
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Settings read from the environment.
#[derive(Debug, Clone)]
pub struct ReindexerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub opensearch_url: String,
    pub fulltext_index_prefix: String,
    /// Heartbeat age after which a reindex lock is stale.
    pub lock_stale_after: chrono::Duration,
    pub page_size: u32,
    pub max_pages: u32,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
}

impl ReindexerConfig {
    /// Read the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 5)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `FULLTEXT_INDEX_PREFIX`: Prefix of tenant indexes (default: search)
    /// - `REINDEX_LOCK_STALE_SECS`: Lock staleness threshold in seconds (required)
    /// - `REINDEX_PAGE_SIZE`: Records per page (default: 200)
    /// - `REINDEX_MAX_PAGES`: Page ceiling per sweep (default: 10000)
    /// - `DATABASE_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `DATABASE_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IndexingError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or_else(|| IndexingError::config("DATABASE_URL must be set"))?;

        let stale_secs: i64 = lookup("REINDEX_LOCK_STALE_SECS")
            .ok_or_else(|| IndexingError::config("REINDEX_LOCK_STALE_SECS must be set"))?
            .parse()
            .map_err(|_| {
                IndexingError::config("REINDEX_LOCK_STALE_SECS must be a number of seconds")
            })?;
        let lock_stale_after = chrono::Duration::try_seconds(stale_secs)
            .filter(|d| *d > chrono::Duration::zero())
            .ok_or_else(|| {
                IndexingError::config("REINDEX_LOCK_STALE_SECS must be a positive number of seconds")
            })?;

        Ok(Self {
            database_url,
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            ),
            opensearch_url: lookup("OPENSEARCH_URL")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            fulltext_index_prefix: lookup("FULLTEXT_INDEX_PREFIX")
                .unwrap_or_else(|| DEFAULT_FULLTEXT_INDEX_PREFIX.to_string()),
            lock_stale_after,
            page_size: parse_or(&lookup, "REINDEX_PAGE_SIZE", DEFAULT_PAGE_SIZE).max(1),
            max_pages: parse_or(&lookup, "REINDEX_MAX_PAGES", DEFAULT_MAX_PAGES).max(1),
            connection_mode: ConnectionMode::parse(lookup("DATABASE_CONNECTION_MODE").as_deref()),
            retry_interval: Duration::from_secs(parse_or(
                &lookup,
                "DATABASE_RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )),
        })
    }

    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            page_size: self.page_size,
            max_pages: self.max_pages,
            ..IndexerConfig::default()
        }
    }

    pub fn lock_config(&self) -> LockConfig {
        LockConfig::new(self.lock_stale_after)
    }
}

fn parse_or<T: FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = %key, value = %raw, "Invalid value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ReindexerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/search"),
            ("REINDEX_LOCK_STALE_SECS", "300"),
        ]))
        .unwrap();

        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.opensearch_url, "http://localhost:9200");
        assert_eq!(config.fulltext_index_prefix, "search");
        assert_eq!(config.lock_stale_after, chrono::Duration::seconds(300));
        assert_eq!(config.page_size, 200);
        assert_eq!(config.max_pages, 10_000);
        assert_eq!(config.connection_mode, ConnectionMode::Retry);
        assert_eq!(config.retry_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_overrides() {
        let config = ReindexerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/search"),
            ("REINDEX_LOCK_STALE_SECS", "60"),
            ("REINDEX_PAGE_SIZE", "50"),
            ("REINDEX_MAX_PAGES", "not-a-number"),
            ("DATABASE_CONNECTION_MODE", "FAIL-FAST"),
        ]))
        .unwrap();

        assert_eq!(config.indexer_config().page_size, 50);
        assert_eq!(config.indexer_config().max_pages, 10_000);
        assert_eq!(config.connection_mode, ConnectionMode::FailFast);
        assert_eq!(config.lock_config().stale_after, chrono::Duration::seconds(60));
    }

    #[test]
    fn test_stale_threshold_is_required() {
        let err = ReindexerConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://db")]))
            .unwrap_err();
        assert!(err.to_string().contains("REINDEX_LOCK_STALE_SECS"));

        assert!(ReindexerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("REINDEX_LOCK_STALE_SECS", "0"),
        ]))
        .is_err());
    }

    #[test]
    fn test_database_url_is_required() {
        let err = ReindexerConfig::from_lookup(lookup(&[("REINDEX_LOCK_STALE_SECS", "60")]))
            .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
