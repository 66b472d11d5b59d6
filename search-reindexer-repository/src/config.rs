//! Configuration types for the StrategySearchService.

/// Configuration for the StrategySearchService.
///
/// Controls the maximum number of records sent to the backends in one bulk
/// index call.
#[derive(Debug, Clone)]
pub struct SearchServiceConfig {
    /// Maximum number of records allowed in a single bulk operation.
    ///
    /// Set to `None` to disable the limit. Defaults to 1000.
    pub max_batch_size: Option<usize>,
}

impl Default for SearchServiceConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Some(1000),
        }
    }
}

impl SearchServiceConfig {
    /// Create a config with no batch size limit.
    ///
    /// # Warning
    ///
    /// Removing batch size limits can lead to memory issues and timeouts when
    /// processing very large batches.
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
        }
    }

    /// Create a config with a custom batch size limit.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
        }
    }
}
