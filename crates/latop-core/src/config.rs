//! Registry configuration.

use crate::buckets::{
    BucketBounds, DEFAULT_BUCKET_COUNT, DEFAULT_MAX_MICROS, DEFAULT_MEDIAN_MICROS,
    DEFAULT_MIN_MICROS,
};
use crate::error::{Error, Result};
use crate::key::KeyShape;

/// Default number of lock partitions: a single registry-wide lock.
pub const DEFAULT_SHARDS: usize = 1;

/// Usage registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyConfig {
    /// Lowest bucket bound in microseconds.
    pub min_micros: u64,

    /// Expected median latency in microseconds.
    pub median_micros: u64,

    /// Highest bucket bound in microseconds.
    pub max_micros: u64,

    /// Number of histogram buckets.
    pub bucket_count: usize,

    /// Arrangement of resource keys.
    pub key_shape: KeyShape,

    /// Number of independently locked partitions.
    pub shards: usize,
}

impl LatencyConfig {
    /// Configuration with default bucket parameters, hierarchical keys and
    /// a single lock.
    pub fn new() -> Self {
        Self {
            min_micros: DEFAULT_MIN_MICROS,
            median_micros: DEFAULT_MEDIAN_MICROS,
            max_micros: DEFAULT_MAX_MICROS,
            bucket_count: DEFAULT_BUCKET_COUNT,
            key_shape: KeyShape::default(),
            shards: DEFAULT_SHARDS,
        }
    }

    /// Set the bucket range.
    pub fn with_bucket_range(
        mut self,
        min_micros: u64,
        median_micros: u64,
        max_micros: u64,
    ) -> Self {
        self.min_micros = min_micros;
        self.median_micros = median_micros;
        self.max_micros = max_micros;
        self
    }

    /// Set the number of buckets.
    pub fn with_bucket_count(mut self, count: usize) -> Self {
        self.bucket_count = count;
        self
    }

    /// Set the key arrangement.
    pub fn with_key_shape(mut self, shape: KeyShape) -> Self {
        self.key_shape = shape;
        self
    }

    /// Key by full namespace.
    pub fn flat(self) -> Self {
        self.with_key_shape(KeyShape::Flat)
    }

    /// Set the number of lock partitions.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Check every parameter.
    pub fn validate(&self) -> Result<()> {
        if self.shards == 0 {
            return Err(Error::InvalidShardCount(self.shards));
        }
        self.bucket_bounds().map(|_| ())
    }

    /// Generate the bucket bounds described by this configuration.
    pub fn bucket_bounds(&self) -> Result<BucketBounds> {
        BucketBounds::with_expected_median(
            self.min_micros,
            self.median_micros,
            self.max_micros,
            self.bucket_count,
        )
    }
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self::new()
    }
}
