//! Usage registry.
//!
//! Maps resource keys to [`LatencyHistogram`]s and assembles sorted
//! snapshot reports. Entries are created lazily on first record and live
//! until the resource is dropped or the registry is cleared.
//!
//! The map is split into one or more partitions, each behind its own
//! [`parking_lot::Mutex`]. With a single partition every `record` and
//! `snapshot` serializes on one lock. With more, all resources of a
//! database hash to the same partition, so per-partition behaviour is
//! identical to the single-lock model.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::buckets::BucketBounds;
use crate::category::CommandCategory;
use crate::config::LatencyConfig;
use crate::error::Result;
use crate::histogram::LatencyHistogram;
use crate::key::{KeyShape, ResourceKey};
use crate::report::{LatencyReport, ResourceStats};

/// Collection slot for operations that targeted a database as a whole.
const DATABASE_SLOT: &str = "";

/// Contents of one partition.
#[derive(Debug)]
enum UsageMap {
    /// Namespace -> histogram.
    Flat(HashMap<ResourceKey, LatencyHistogram>),
    /// Database -> collection -> histogram.
    Hierarchical(HashMap<String, HashMap<String, LatencyHistogram>>),
}

impl UsageMap {
    fn new(shape: KeyShape) -> Self {
        match shape {
            KeyShape::Flat => UsageMap::Flat(HashMap::new()),
            KeyShape::Hierarchical => UsageMap::Hierarchical(HashMap::new()),
        }
    }

    fn clear(&mut self) {
        match self {
            UsageMap::Flat(map) => map.clear(),
            UsageMap::Hierarchical(map) => map.clear(),
        }
    }

    fn resource_count(&self) -> usize {
        match self {
            UsageMap::Flat(map) => map.len(),
            UsageMap::Hierarchical(map) => map.values().map(HashMap::len).sum(),
        }
    }
}

/// Run `f` on the entry for `key`, inserting `make()` first if it is absent.
///
/// Looks up by reference so existing entries never allocate a key.
fn with_entry<K, Q, V, R>(
    map: &mut HashMap<K, V>,
    key: &Q,
    make: impl FnOnce() -> V,
    f: impl FnOnce(&mut V) -> R,
) -> R
where
    K: Borrow<Q> + Hash + Eq,
    Q: ToOwned<Owned = K> + Hash + Eq + ?Sized,
{
    if let Some(value) = map.get_mut(key) {
        return f(value);
    }
    f(map.entry(key.to_owned()).or_insert_with(make))
}

/// Concurrency-safe registry of per-resource latency histograms.
pub struct UsageRegistry {
    config: LatencyConfig,
    bounds: Arc<BucketBounds>,
    shards: Box<[Mutex<UsageMap>]>,
    hasher: RandomState,
}

impl UsageRegistry {
    /// Build a registry, generating its bucket bounds once.
    pub fn new(config: LatencyConfig) -> Result<Self> {
        config.validate()?;
        let bounds = config.bucket_bounds()?;
        Ok(Self::with_bounds(config, bounds))
    }

    /// Build from an already validated config and its bounds.
    fn with_bounds(config: LatencyConfig, bounds: BucketBounds) -> Self {
        info!(
            min_us = config.min_micros,
            median_us = config.median_micros,
            max_us = config.max_micros,
            buckets = bounds.len(),
            key_shape = ?config.key_shape,
            shards = config.shards,
            "latency registry created"
        );

        let shards = (0..config.shards)
            .map(|_| Mutex::new(UsageMap::new(config.key_shape)))
            .collect();

        Self {
            config,
            bounds: Arc::new(bounds),
            shards,
            hasher: RandomState::new(),
        }
    }

    /// Configuration the registry was built with.
    pub fn config(&self) -> &LatencyConfig {
        &self.config
    }

    /// Bucket bounds shared by every histogram.
    pub fn bounds(&self) -> &BucketBounds {
        &self.bounds
    }

    /// Partition owning `key`.
    fn shard_for(&self, key: &ResourceKey) -> &Mutex<UsageMap> {
        if self.shards.len() == 1 {
            return &self.shards[0];
        }
        // Partition by database in both shapes so a database-wide drop
        // touches one partition.
        let hash = self.hasher.hash_one(key.database_name());
        &self.shards[(hash % self.shards.len() as u64) as usize]
    }

    /// Record one completed operation.
    ///
    /// Callers are expected to have filtered out command and unknown
    /// namespaces already (see [`ResourceKey::from_namespace`]).
    pub fn record(
        &self,
        key: &ResourceKey,
        category: CommandCategory,
        latency_us: u64,
        is_error: bool,
        is_user: bool,
    ) {
        let new_histogram = || {
            debug!(resource = %key, "tracking new resource");
            LatencyHistogram::new(Arc::clone(&self.bounds))
        };
        let increment = |histogram: &mut LatencyHistogram| {
            histogram.increment(category, latency_us, is_error, is_user)
        };

        let mut usage = self.shard_for(key).lock();
        match &mut *usage {
            UsageMap::Flat(map) => with_entry(map, key, new_histogram, increment),
            UsageMap::Hierarchical(map) => {
                let collection = key.collection_name().unwrap_or(DATABASE_SLOT);
                with_entry(map, key.database_name(), HashMap::new, |collections| {
                    with_entry(collections, collection, new_histogram, increment)
                })
            }
        }
    }

    /// Record one completed operation with a measured duration.
    ///
    /// Durations beyond `u64::MAX` microseconds saturate.
    pub fn record_elapsed(
        &self,
        key: &ResourceKey,
        category: CommandCategory,
        elapsed: Duration,
        is_error: bool,
        is_user: bool,
    ) {
        let latency_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.record(key, category, latency_us, is_error, is_user);
    }

    /// Forget everything recorded for `key`.
    ///
    /// A collection key removes that collection; a database key removes the
    /// database with all of its collections. Returns whether anything was
    /// removed. Later records for the key start from zero.
    pub fn resource_dropped(&self, key: &ResourceKey) -> bool {
        let mut usage = self.shard_for(key).lock();
        let removed = match &mut *usage {
            UsageMap::Flat(map) => match key.collection_name() {
                Some(_) => map.remove(key).is_some(),
                None => {
                    let before = map.len();
                    map.retain(|resource, _| resource.database_name() != key.database_name());
                    map.len() != before
                }
            },
            UsageMap::Hierarchical(map) => match key.collection_name() {
                Some(collection) => {
                    let Some(collections) = map.get_mut(key.database_name()) else {
                        return false;
                    };
                    let removed = collections.remove(collection).is_some();
                    if collections.is_empty() {
                        map.remove(key.database_name());
                    }
                    removed
                }
                None => map.remove(key.database_name()).is_some(),
            },
        };

        if removed {
            debug!(resource = %key, "resource dropped");
        }
        removed
    }

    /// Number of tracked leaf resources (namespaces or collections).
    pub fn resource_count(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().resource_count())
            .sum()
    }

    /// Forget every resource.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.lock().clear();
        }
    }

    /// Produce a sorted report of everything recorded so far.
    ///
    /// Compact (`verbose == false`) reports fold categories into read,
    /// write and other; with hierarchical keys every database's collections
    /// are first merged into one histogram. Verbose reports list every
    /// category, nested per collection for hierarchical keys.
    ///
    /// Each partition is read under its lock, so every histogram is seen
    /// whole; partitions are not frozen against one another.
    pub fn snapshot(&self, verbose: bool) -> LatencyReport {
        let mut latency_stats = BTreeMap::new();

        for shard in self.shards.iter() {
            let usage = shard.lock();
            match &*usage {
                UsageMap::Flat(map) => {
                    for (resource, histogram) in map {
                        let stats = if verbose {
                            ResourceStats::Verbose(histogram.verbose_stats())
                        } else {
                            ResourceStats::Grouped(histogram.grouped_stats())
                        };
                        latency_stats.insert(resource.namespace(), stats);
                    }
                }
                UsageMap::Hierarchical(map) => {
                    for (database, collections) in map {
                        let stats = if verbose {
                            ResourceStats::Collections(
                                collections
                                    .iter()
                                    .map(|(name, hist)| (name.clone(), hist.verbose_stats()))
                                    .collect(),
                            )
                        } else {
                            let total = self.compact(collections.values());
                            ResourceStats::Grouped(total.grouped_stats())
                        };
                        latency_stats.insert(database.clone(), stats);
                    }
                }
            }
        }

        debug!(resources = latency_stats.len(), verbose, "latency snapshot taken");
        LatencyReport { latency_stats }
    }

    /// Merge collection histograms into one database histogram.
    fn compact<'a>(
        &self,
        histograms: impl Iterator<Item = &'a LatencyHistogram>,
    ) -> LatencyHistogram {
        let mut total = LatencyHistogram::new(Arc::clone(&self.bounds));
        for histogram in histograms {
            total.add(histogram);
        }
        total
    }
}

impl Default for UsageRegistry {
    fn default() -> Self {
        Self::with_bounds(LatencyConfig::default(), BucketBounds::latency())
    }
}

/// Shared usage registry handle.
pub type SharedUsageRegistry = Arc<UsageRegistry>;

/// Create a new shared usage registry.
pub fn new_shared_registry(config: LatencyConfig) -> Result<SharedUsageRegistry> {
    Ok(Arc::new(UsageRegistry::new(config)?))
}
