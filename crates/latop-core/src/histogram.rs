//! Per-resource latency histograms.
//!
//! A [`LatencyHistogram`] holds one [`HistogramData`] per command category.
//! It carries no locking of its own; the owning registry serializes access.

use std::sync::Arc;

use crate::buckets::BucketBounds;
use crate::category::{CommandCategory, CommandGroup};
use crate::report::{BucketCount, GroupedStats, HistogramStats, VerboseStats};

/// Counters for one (resource, category) pair.
///
/// Only successful user operations touch the buckets and the sum.
/// Failed user operations bump `error_count`; anything not issued by an
/// external user bumps `non_user_count` and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramData {
    buckets: Vec<u64>,
    sum: u64,
    success_count: u64,
    error_count: u64,
    non_user_count: u64,
}

impl HistogramData {
    /// Zeroed counters for `bucket_count` buckets.
    pub(crate) fn new(bucket_count: usize) -> Self {
        Self {
            buckets: vec![0; bucket_count],
            sum: 0,
            success_count: 0,
            error_count: 0,
            non_user_count: 0,
        }
    }

    /// Count one operation. `bounds` must have one entry per bucket.
    pub(crate) fn increment(
        &mut self,
        bounds: &BucketBounds,
        latency_us: u64,
        is_error: bool,
        is_user: bool,
    ) {
        if !is_user {
            self.non_user_count += 1;
            return;
        }

        if is_error {
            self.error_count += 1;
            return;
        }

        // Values above every bound still count toward sum and count.
        if let Some(bucket) = bounds.find_bucket(latency_us) {
            self.buckets[bucket] += 1;
        }
        self.sum = self.sum.saturating_add(latency_us);
        self.success_count += 1;
    }

    /// Fold `other` into `self`, field by field.
    pub(crate) fn add(&mut self, other: &HistogramData) {
        assert_eq!(
            self.buckets.len(),
            other.buckets.len(),
            "histogram bucket layouts differ"
        );

        for (mine, theirs) in self.buckets.iter_mut().zip(&other.buckets) {
            *mine = mine.saturating_add(*theirs);
        }
        self.sum = self.sum.saturating_add(other.sum);
        self.success_count = self.success_count.saturating_add(other.success_count);
        self.error_count = self.error_count.saturating_add(other.error_count);
        self.non_user_count = self.non_user_count.saturating_add(other.non_user_count);
    }

    /// Per-bucket counts.
    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// Sum of successful user latencies.
    pub fn sum(&self) -> u64 {
        self.sum
    }

    /// Successful user operations.
    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    /// Failed user operations.
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Operations not issued by an external user.
    pub fn non_user_count(&self) -> u64 {
        self.non_user_count
    }

    /// Serialize against the bounds these counters were recorded with.
    pub(crate) fn stats(&self, bounds: &BucketBounds) -> HistogramStats {
        HistogramStats {
            histogram: bounds
                .iter()
                .zip(&self.buckets)
                .map(|(le, &count)| BucketCount { le, count })
                .collect(),
            sum: self.sum,
            count: self.success_count,
            errors: self.error_count,
            non_user_ops: self.non_user_count,
        }
    }
}

/// Latency counters of one resource, split by command category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyHistogram {
    bounds: Arc<BucketBounds>,
    data: [HistogramData; CommandCategory::COUNT],
}

impl LatencyHistogram {
    /// Empty histogram over shared bounds.
    pub fn new(bounds: Arc<BucketBounds>) -> Self {
        let bucket_count = bounds.len();
        Self {
            bounds,
            data: std::array::from_fn(|_| HistogramData::new(bucket_count)),
        }
    }

    /// Count one operation against `category`.
    pub fn increment(
        &mut self,
        category: CommandCategory,
        latency_us: u64,
        is_error: bool,
        is_user: bool,
    ) {
        self.data[category.index()].increment(&self.bounds, latency_us, is_error, is_user);
    }

    /// Merge every category of `other` into `self`.
    ///
    /// Merging is commutative and associative, so the order collections
    /// are folded in does not matter.
    ///
    /// # Panics
    ///
    /// Panics if the two histograms were built over different bucket bounds.
    pub fn add(&mut self, other: &LatencyHistogram) {
        assert!(
            Arc::ptr_eq(&self.bounds, &other.bounds) || self.bounds == other.bounds,
            "cannot merge histograms with different bucket bounds"
        );

        for (mine, theirs) in self.data.iter_mut().zip(&other.data) {
            mine.add(theirs);
        }
    }

    /// Counters of one category.
    pub fn data(&self, category: CommandCategory) -> &HistogramData {
        &self.data[category.index()]
    }

    /// Counters of every category in `group`, merged.
    pub fn group(&self, group: CommandGroup) -> HistogramData {
        let mut merged = HistogramData::new(self.bounds.len());
        for category in group.categories() {
            merged.add(self.data(category));
        }
        merged
    }

    /// Bounds this histogram buckets against.
    pub fn bounds(&self) -> &BucketBounds {
        &self.bounds
    }

    /// Compact serialization: read, write and other groups.
    pub fn grouped_stats(&self) -> GroupedStats {
        GroupedStats {
            read: self.group(CommandGroup::Read).stats(&self.bounds),
            write: self.group(CommandGroup::Write).stats(&self.bounds),
            other: self.group(CommandGroup::Other).stats(&self.bounds),
        }
    }

    /// Verbose serialization: one entry per command category.
    pub fn verbose_stats(&self) -> VerboseStats {
        let stats = |category: CommandCategory| self.data(category).stats(&self.bounds);
        VerboseStats {
            insert: stats(CommandCategory::Insert),
            find: stats(CommandCategory::Find),
            find_and_modify: stats(CommandCategory::FindAndModify),
            update: stats(CommandCategory::Update),
            delete: stats(CommandCategory::Delete),
            aggregate: stats(CommandCategory::Aggregate),
            distinct: stats(CommandCategory::Distinct),
            other: stats(CommandCategory::Other),
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new(Arc::new(BucketBounds::latency()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn bounds() -> Arc<BucketBounds> {
        Arc::new(BucketBounds::latency())
    }

    fn random_histogram(rng: &mut StdRng, bounds: &Arc<BucketBounds>) -> LatencyHistogram {
        let mut hist = LatencyHistogram::new(Arc::clone(bounds));
        for _ in 0..rng.gen_range(0..200) {
            let category = CommandCategory::ALL[rng.gen_range(0..CommandCategory::COUNT)];
            let latency = rng.gen_range(0..80_000_000u64);
            hist.increment(category, latency, rng.gen_bool(0.1), rng.gen_bool(0.8));
        }
        hist
    }

    #[test]
    fn test_non_user_only_counts_presence() {
        let mut hist = LatencyHistogram::default();
        hist.increment(CommandCategory::Find, 5_000, false, false);
        hist.increment(CommandCategory::Find, 5_000, true, false);

        let data = hist.data(CommandCategory::Find);
        assert_eq!(data.non_user_count(), 2);
        assert_eq!(data.error_count(), 0);
        assert_eq!(data.success_count(), 0);
        assert_eq!(data.sum(), 0);
        assert!(data.buckets().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_user_error_skips_buckets() {
        let mut hist = LatencyHistogram::default();
        hist.increment(CommandCategory::Update, 5_000, true, true);

        let data = hist.data(CommandCategory::Update);
        assert_eq!(data.error_count(), 1);
        assert_eq!(data.success_count(), 0);
        assert_eq!(data.sum(), 0);
        assert!(data.buckets().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_user_success_fills_bucket() {
        let mut hist = LatencyHistogram::default();
        hist.increment(CommandCategory::Insert, 2_000, false, true);

        let data = hist.data(CommandCategory::Insert);
        let bucket = hist.bounds().find_bucket(2_000).unwrap();
        assert_eq!(data.buckets()[bucket], 1);
        assert_eq!(data.buckets().iter().sum::<u64>(), 1);
        assert_eq!(data.sum(), 2_000);
        assert_eq!(data.success_count(), 1);
    }

    #[test]
    fn test_overflow_counts_sum_not_bucket() {
        let mut hist = LatencyHistogram::default();
        let latency = hist.bounds().max() + 1;
        hist.increment(CommandCategory::Other, latency, false, true);

        let data = hist.data(CommandCategory::Other);
        assert!(data.buckets().iter().all(|&c| c == 0));
        assert_eq!(data.sum(), latency);
        assert_eq!(data.success_count(), 1);
    }

    #[test]
    fn test_categories_are_independent() {
        let mut hist = LatencyHistogram::default();
        hist.increment(CommandCategory::Distinct, 1_500, false, true);

        for category in CommandCategory::ALL {
            let expected = u64::from(category == CommandCategory::Distinct);
            assert_eq!(hist.data(category).success_count(), expected, "{category}");
        }
    }

    #[test]
    fn test_grouped_find_lands_in_read() {
        let mut hist = LatencyHistogram::default();
        hist.increment(CommandCategory::Find, 3_000, false, true);

        let grouped = hist.grouped_stats();
        let bucket = hist.bounds().find_bucket(3_000).unwrap();

        assert_eq!(grouped.read.count, 1);
        assert_eq!(grouped.read.sum, 3_000);
        assert_eq!(grouped.read.histogram[bucket].count, 1);
        assert_eq!(grouped.read.histogram.iter().map(|b| b.count).sum::<u64>(), 1);

        for stats in [&grouped.write, &grouped.other] {
            assert_eq!(stats.count, 0);
            assert_eq!(stats.sum, 0);
            assert!(stats.histogram.iter().all(|b| b.count == 0));
        }
    }

    #[test]
    fn test_grouped_merges_write_categories() {
        let mut hist = LatencyHistogram::default();
        hist.increment(CommandCategory::Insert, 1_000, false, true);
        hist.increment(CommandCategory::FindAndModify, 1_000, false, true);
        hist.increment(CommandCategory::Update, 1_000, true, true);
        hist.increment(CommandCategory::Delete, 1_000, false, false);

        let write = hist.grouped_stats().write;
        assert_eq!(write.count, 2);
        assert_eq!(write.sum, 2_000);
        assert_eq!(write.errors, 1);
        assert_eq!(write.non_user_ops, 1);
        assert_eq!(write.histogram[0], BucketCount { le: 1_000, count: 2 });
    }

    #[test]
    fn test_verbose_has_every_bound() {
        let hist = LatencyHistogram::default();
        let verbose = hist.verbose_stats();
        for category in CommandCategory::ALL {
            let bounds: Vec<u64> = verbose.get(category).histogram.iter().map(|b| b.le).collect();
            assert_eq!(bounds, hist.bounds().as_slice());
        }
    }

    #[test]
    fn test_add_is_commutative_and_associative() {
        let mut rng = StdRng::seed_from_u64(7);
        let bounds = bounds();

        for _ in 0..20 {
            let a = random_histogram(&mut rng, &bounds);
            let b = random_histogram(&mut rng, &bounds);
            let c = random_histogram(&mut rng, &bounds);

            // (A + B) + C
            let mut left = a.clone();
            left.add(&b);
            left.add(&c);

            // A + (B + C)
            let mut bc = b.clone();
            bc.add(&c);
            let mut right = a.clone();
            right.add(&bc);

            // B + (A + C)
            let mut ac = a.clone();
            ac.add(&c);
            let mut swapped = b.clone();
            swapped.add(&ac);

            assert_eq!(left, right);
            assert_eq!(left, swapped);
        }
    }

    #[test]
    #[should_panic(expected = "different bucket bounds")]
    fn test_add_rejects_other_layout() {
        let narrow = Arc::new(BucketBounds::with_expected_median(100, 1_000, 10_000, 4).unwrap());
        let mut small = LatencyHistogram::new(narrow);
        small.increment(CommandCategory::Find, 900, false, true);

        let mut hist = LatencyHistogram::default();
        hist.add(&small);
    }

    #[test]
    fn test_add_accepts_equal_bounds_from_separate_allocations() {
        let mut hist = LatencyHistogram::default();
        let mut other = LatencyHistogram::new(bounds());
        other.increment(CommandCategory::Find, 900, false, true);

        hist.add(&other);
        assert_eq!(hist.data(CommandCategory::Find).success_count(), 1);
        assert_eq!(hist.data(CommandCategory::Find).buckets()[0], 1);
    }

    #[test]
    fn test_data_layout_follows_bounds() {
        let narrow = Arc::new(BucketBounds::with_expected_median(100, 1_000, 10_000, 4).unwrap());
        let mut hist = LatencyHistogram::new(Arc::clone(&narrow));
        hist.increment(CommandCategory::Find, 10_000, false, true);

        for category in CommandCategory::ALL {
            assert_eq!(hist.data(category).buckets().len(), narrow.len());
        }
        assert_eq!(hist.data(CommandCategory::Find).buckets()[narrow.len() - 1], 1);
    }

    #[test]
    fn test_add_empty_is_identity() {
        let mut rng = StdRng::seed_from_u64(11);
        let bounds = bounds();
        let a = random_histogram(&mut rng, &bounds);

        let mut merged = a.clone();
        merged.add(&LatencyHistogram::new(Arc::clone(&bounds)));
        assert_eq!(merged, a);
    }
}
