use serde::{Deserialize, Serialize};

/// Documents buffered in memory before a partition is spilled to disk.
pub const DEFAULT_PARTITION_SIZE: usize = 205;
/// Distinct query terms whose posting lists are kept decoded per query.
pub const DEFAULT_CACHE_CAPACITY: usize = 20;

/// Tunables handed to the builder and to every query context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// `usize::MAX` keeps the whole corpus in a single partition.
    pub partition_size: usize,
    pub cache_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { partition_size: DEFAULT_PARTITION_SIZE, cache_capacity: DEFAULT_CACHE_CAPACITY }
    }
}

impl IndexConfig {
    pub fn with_partition_size(mut self, docs: usize) -> Self {
        self.partition_size = docs.max(1);
        self
    }

    pub fn with_cache_capacity(mut self, terms: usize) -> Self {
        self.cache_capacity = terms;
        self
    }

    pub fn unpartitioned(self) -> Self {
        self.with_partition_size(usize::MAX)
    }
}
