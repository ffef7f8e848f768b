//! Core error types.

use thiserror::Error;

/// Errors raised while configuring a registry or rendering a report.
///
/// Recording and snapshotting never fail; only construction and export do.
#[derive(Debug, Error)]
pub enum Error {
    /// Bucket range is empty or out of order.
    #[error("invalid bucket range: expected 0 < min ({min}) <= median ({median}) <= max ({max})")]
    InvalidBucketRange { min: u64, median: u64, max: u64 },

    /// Too few buckets to split around the median.
    #[error("invalid bucket count {0}: at least 2 buckets are required")]
    InvalidBucketCount(usize),

    /// A registry needs at least one partition.
    #[error("invalid shard count {0}: at least 1 shard is required")]
    InvalidShardCount(usize),

    /// Report rendering failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for fallible core operations.
pub type Result<T> = std::result::Result<T, Error>;
