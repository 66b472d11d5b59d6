//! Strategy fan-out service implementation.
//!
//! This module provides the default `SearchService`: a facade that validates
//! input and forwards every operation to each registered, available strategy.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::SearchServiceConfig;
use crate::errors::SearchServiceError;
use crate::interfaces::{SearchService, SearchStrategy};
use crate::types::{BatchOperationResult, BatchOperationSummary};
use search_reindexer_shared::IndexableRecord;

/// The default search facade.
///
/// Operations are attempted on every available strategy, even after one of
/// them failed; the first failure is then returned. Unavailable strategies are
/// skipped with a warning.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use search_reindexer_repository::opensearch::{FulltextIndexConfig, OpenSearchStrategy};
/// use search_reindexer_repository::StrategySearchService;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fulltext = OpenSearchStrategy::new("http://localhost:9200", FulltextIndexConfig::new("search")).await?;
/// let service = StrategySearchService::new(vec![Arc::new(fulltext)]);
/// # Ok(())
/// # }
/// ```
pub struct StrategySearchService {
    strategies: Vec<Arc<dyn SearchStrategy>>,
    config: SearchServiceConfig,
}

impl StrategySearchService {
    /// Create a new service with default configuration.
    ///
    /// The default configuration includes a batch size limit of 1000 records.
    pub fn new(strategies: Vec<Arc<dyn SearchStrategy>>) -> Self {
        Self {
            strategies,
            config: SearchServiceConfig::default(),
        }
    }

    /// Create a new service with custom configuration.
    pub fn with_config(
        strategies: Vec<Arc<dyn SearchStrategy>>,
        config: SearchServiceConfig,
    ) -> Self {
        Self { strategies, config }
    }

    /// Check if batch size exceeds the configured limit.
    fn validate_batch_size(&self, size: usize) -> Result<(), SearchServiceError> {
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(SearchServiceError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }

    /// Validate that an identifier is present.
    fn validate_identifier(field_name: &str, value: &str) -> Result<(), SearchServiceError> {
        if value.trim().is_empty() {
            return Err(SearchServiceError::validation(format!(
                "{} is required",
                field_name
            )));
        }
        Ok(())
    }

    fn validate_record(record: &IndexableRecord) -> Result<(), SearchServiceError> {
        Self::validate_identifier("entity_id", &record.entity_id)?;
        Self::validate_identifier("record_id", &record.record_id)?;
        Self::validate_identifier("tenant_id", &record.tenant_id)
    }

    /// Strategies that report themselves available.
    async fn available_strategies(&self) -> Vec<Arc<dyn SearchStrategy>> {
        let mut available = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            if strategy.is_available().await {
                available.push(strategy.clone());
            } else {
                warn!(strategy = %strategy.id(), "Search strategy unavailable, skipping");
            }
        }
        available
    }

    /// Keep the first error of a fan-out, logging the rest.
    fn keep_first(
        first: &mut Option<SearchServiceError>,
        strategy: &str,
        error: SearchServiceError,
    ) {
        warn!(strategy = %strategy, error = %error, "Search strategy operation failed");
        if first.is_none() {
            *first = Some(SearchServiceError::strategy_failed(strategy, error.to_string()));
        }
    }
}

#[async_trait]
impl SearchService for StrategySearchService {
    async fn index(&self, record: &IndexableRecord) -> Result<(), SearchServiceError> {
        Self::validate_record(record)?;

        let mut first_error = None;
        for strategy in self.available_strategies().await {
            if let Err(e) = strategy.index(record).await {
                Self::keep_first(&mut first_error, strategy.id(), e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!(doc_id = %record.document_id(), "Record indexed");
                Ok(())
            }
        }
    }

    /// Index many records and merge per-strategy outcomes.
    ///
    /// A record counts as succeeded only if every available strategy accepted it.
    /// A strategy failing the whole batch marks every record of the batch failed.
    async fn bulk_index(
        &self,
        records: &[IndexableRecord],
    ) -> Result<BatchOperationSummary, SearchServiceError> {
        if records.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        self.validate_batch_size(records.len())?;
        for record in records {
            Self::validate_record(record)?;
        }

        let mut failures: HashMap<String, SearchServiceError> = HashMap::new();
        for strategy in self.available_strategies().await {
            match strategy.bulk_index(records).await {
                Ok(summary) => {
                    for failure in summary.failures() {
                        let key = format!("{}:{}", failure.entity_id, failure.record_id);
                        let error = failure.error.clone().unwrap_or_else(|| {
                            SearchServiceError::bulk_index("record rejected without error")
                        });
                        failures.entry(key).or_insert_with(|| {
                            SearchServiceError::strategy_failed(strategy.id(), error.to_string())
                        });
                    }
                }
                Err(e) => {
                    warn!(strategy = %strategy.id(), error = %e, count = records.len(), "Bulk index failed");
                    for record in records {
                        failures.entry(record.document_id()).or_insert_with(|| {
                            SearchServiceError::strategy_failed(strategy.id(), e.to_string())
                        });
                    }
                }
            }
        }

        let results = records
            .iter()
            .map(|record| match failures.remove(&record.document_id()) {
                Some(error) => {
                    BatchOperationResult::failed(&record.entity_id, &record.record_id, error)
                }
                None => BatchOperationResult::succeeded(&record.entity_id, &record.record_id),
            })
            .collect();

        Ok(BatchOperationSummary::from_results(results))
    }

    async fn delete(
        &self,
        entity_id: &str,
        record_id: &str,
        tenant_id: &str,
    ) -> Result<(), SearchServiceError> {
        Self::validate_identifier("entity_id", entity_id)?;
        Self::validate_identifier("record_id", record_id)?;
        Self::validate_identifier("tenant_id", tenant_id)?;

        let mut first_error = None;
        for strategy in self.available_strategies().await {
            if let Err(e) = strategy.delete(entity_id, record_id, tenant_id).await {
                Self::keep_first(&mut first_error, strategy.id(), e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn purge(&self, entity_id: &str, tenant_id: &str) -> Result<(), SearchServiceError> {
        Self::validate_identifier("entity_id", entity_id)?;
        Self::validate_identifier("tenant_id", tenant_id)?;

        let mut first_error = None;
        for strategy in self.available_strategies().await {
            if let Err(e) = strategy.purge(entity_id, tenant_id).await {
                Self::keep_first(&mut first_error, strategy.id(), e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn get_strategy(&self, id: &str) -> Option<Arc<dyn SearchStrategy>> {
        self.strategies.iter().find(|s| s.id() == id).cloned()
    }

    fn strategies(&self) -> Vec<Arc<dyn SearchStrategy>> {
        self.strategies.clone()
    }
}
