//! latop core - per-resource latency histograms.
//!
//! Completed operations are classified by command category and by the
//! resource (database, or database + collection) they targeted. Each
//! resource accumulates a log-spaced latency histogram per category, and
//! the registry renders sorted, nested snapshot reports on demand.
//!
//! # Usage
//!
//! ```
//! use latop_core::{CommandCategory, LatencyConfig, ResourceKey, UsageRegistry};
//!
//! let registry = UsageRegistry::new(LatencyConfig::default()).unwrap();
//!
//! if let Some(key) = ResourceKey::from_namespace("shop.orders") {
//!     let category = CommandCategory::from_command_name("find");
//!     registry.record(&key, category, 2_500, false, true);
//! }
//!
//! let report = registry.snapshot(false);
//! assert_eq!(report.len(), 1);
//! let json = report.to_json().unwrap();
//! assert!(json.starts_with("{\"latencyStats\":{\"shop\":"));
//! ```

pub mod buckets;
pub mod category;
pub mod config;
pub mod error;
pub mod histogram;
pub mod key;
pub mod registry;
pub mod report;

pub use buckets::BucketBounds;
pub use category::{CommandCategory, CommandGroup};
pub use config::LatencyConfig;
pub use error::{Error, Result};
pub use histogram::{HistogramData, LatencyHistogram};
pub use key::{KeyShape, ResourceKey};
pub use registry::{new_shared_registry, SharedUsageRegistry, UsageRegistry};
pub use report::{
    BucketCount, GroupedStats, HistogramStats, LatencyReport, ResourceStats, VerboseStats,
};
