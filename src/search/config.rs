//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// Minimum heap tantivy accepts per indexing thread
pub const MIN_HEAP_PER_THREAD: usize = 15_000_000;

/// Search index configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchConfig {
    /// Path to the search index directory
    pub index_path: PathBuf,

    /// Index writer heap size in bytes (default: 50MB)
    #[validate(range(min = 15_000_000))]
    pub writer_heap_size: usize,

    /// Number of threads for indexing
    #[validate(range(min = 1, max = 8))]
    pub indexing_threads: usize,

    /// Staged changes after which a commit also consolidates segments
    #[validate(range(min = 1))]
    pub optimize_threshold: usize,

    /// Upper bound (and default) for the page size of `list`
    #[validate(range(min = 1, max = 100))]
    pub max_results: usize,
}

impl SearchConfig {
    /// Thread count that keeps every thread above the tantivy heap floor
    pub fn effective_threads(&self) -> usize {
        let affordable = (self.writer_heap_size / MIN_HEAP_PER_THREAD).max(1);
        self.indexing_threads.clamp(1, affordable)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("./data/event_index"),
            writer_heap_size: 50_000_000, // 50MB
            indexing_threads: 2,
            optimize_threshold: 5000,
            max_results: 100,
        }
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn index_path(mut self, path: PathBuf) -> Self {
        self.config.index_path = path;
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn indexing_threads(mut self, threads: usize) -> Self {
        self.config.indexing_threads = threads;
        self
    }

    pub fn optimize_threshold(mut self, threshold: usize) -> Self {
        self.config.optimize_threshold = threshold;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.optimize_threshold, 5000);
        assert_eq!(config.max_results, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_threads_respects_heap_floor() {
        let config = SearchConfigBuilder::new()
            .writer_heap_size(30_000_000)
            .indexing_threads(8)
            .build();
        assert_eq!(config.effective_threads(), 2);

        let config = SearchConfigBuilder::new()
            .writer_heap_size(MIN_HEAP_PER_THREAD)
            .indexing_threads(4)
            .build();
        assert_eq!(config.effective_threads(), 1);
    }

    #[test]
    fn test_validation_rejects_small_heap() {
        let config = SearchConfigBuilder::new().writer_heap_size(1_000).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_results_capped_at_page_maximum() {
        let mut config = SearchConfig::default();
        config.max_results = 100;
        assert!(config.validate().is_ok());

        config.max_results = 101;
        assert!(config.validate().is_err());

        config.max_results = 0;
        assert!(config.validate().is_err());
    }
}
