//! Log-spaced latency bucket bounds.
//!
//! Bounds are generated once at registry construction and shared read-only
//! by every histogram afterwards. Resolution is concentrated around an
//! expected median: half of the buckets cover `[min, median]` and the other
//! half cover `(median, max]`, each half spaced exponentially.

use crate::error::{Error, Result};

/// Default lowest bound: 1 millisecond.
pub const DEFAULT_MIN_MICROS: u64 = 1_000;

/// Default expected median: 10 milliseconds.
pub const DEFAULT_MEDIAN_MICROS: u64 = 10_000;

/// Default highest bound: 60 seconds.
pub const DEFAULT_MAX_MICROS: u64 = 60_000_000;

/// Default number of buckets.
pub const DEFAULT_BUCKET_COUNT: usize = 16;

/// Ordered upper bounds of a latency histogram, in microseconds.
///
/// Bucket `i` counts values `v` with `bounds[i - 1] < v <= bounds[i]`.
/// Values above the last bound fall into no bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketBounds {
    bounds: Vec<u64>,
}

impl BucketBounds {
    /// Generate `count` bounds between `min` and `max`, split around `median`.
    ///
    /// The lower `count / 2` bounds run from `min` to `median`; the remaining
    /// bounds run from just above `median` to `max`. The last bound is
    /// always exactly `max`.
    pub fn with_expected_median(min: u64, median: u64, max: u64, count: usize) -> Result<Self> {
        if min == 0 || min > median || median > max {
            return Err(Error::InvalidBucketRange { min, median, max });
        }
        if count < 2 {
            return Err(Error::InvalidBucketCount(count));
        }

        Ok(Self {
            bounds: generate(min, median, max, count),
        })
    }

    /// Bounds generated from the default parameters.
    pub fn latency() -> Self {
        Self {
            bounds: generate(
                DEFAULT_MIN_MICROS,
                DEFAULT_MEDIAN_MICROS,
                DEFAULT_MAX_MICROS,
                DEFAULT_BUCKET_COUNT,
            ),
        }
    }

    /// Index of the smallest bound `>= value`, or `None` if `value` exceeds
    /// every bound.
    pub fn find_bucket(&self, value: u64) -> Option<usize> {
        match self.bounds.last() {
            Some(&largest) if value <= largest => {
                Some(self.bounds.partition_point(|&bound| bound < value))
            }
            _ => None,
        }
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Always false for generated bounds.
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Largest bound.
    pub fn max(&self) -> u64 {
        self.bounds.last().copied().unwrap_or(0)
    }

    /// Bounds in ascending order.
    pub fn as_slice(&self) -> &[u64] {
        &self.bounds
    }

    /// Iterate bounds in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.bounds.iter().copied()
    }
}

impl Default for BucketBounds {
    fn default() -> Self {
        Self::latency()
    }
}

fn generate(min: u64, median: u64, max: u64, count: usize) -> Vec<u64> {
    let lower_count = count / 2;
    let upper_count = count - lower_count;

    let mut bounds = exponential(min, median, lower_count);
    // The upper run starts at the median, which the lower run already ends on.
    bounds.extend(exponential(median, max, upper_count + 1).into_iter().skip(1));
    bounds
}

/// `count` values spaced by a constant ratio from `min` to `max`.
///
/// Intermediate values are rounded to the nearest integer and the final
/// value is pinned to `max` so floating point drift never moves the end.
fn exponential(min: u64, max: u64, count: usize) -> Vec<u64> {
    match count {
        0 => return Vec::new(),
        1 => return vec![max],
        _ => {}
    }

    let ratio = ((max as f64 / min as f64).ln() / (count - 1) as f64).exp();

    let mut values = Vec::with_capacity(count);
    let mut current = min as f64;
    values.push(min);
    for _ in 1..count {
        current *= ratio;
        values.push(current.round() as u64);
    }
    if let Some(last) = values.last_mut() {
        *last = max;
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds_shape() {
        let bounds = BucketBounds::latency();
        assert_eq!(bounds.len(), DEFAULT_BUCKET_COUNT);
        assert_eq!(bounds.as_slice()[0], DEFAULT_MIN_MICROS);
        assert_eq!(bounds.max(), DEFAULT_MAX_MICROS);

        // 8th and 9th bounds bracket the median.
        assert!(bounds.as_slice()[7] <= DEFAULT_MEDIAN_MICROS);
        assert!(bounds.as_slice()[8] >= DEFAULT_MEDIAN_MICROS);
        assert_eq!(bounds.as_slice()[7], DEFAULT_MEDIAN_MICROS);
    }

    #[test]
    fn test_default_matches_generated() {
        let generated = BucketBounds::with_expected_median(
            DEFAULT_MIN_MICROS,
            DEFAULT_MEDIAN_MICROS,
            DEFAULT_MAX_MICROS,
            DEFAULT_BUCKET_COUNT,
        )
        .unwrap();
        assert_eq!(generated, BucketBounds::default());
    }

    #[test]
    fn test_bounds_strictly_increase() {
        let bounds = BucketBounds::latency();
        for pair in bounds.as_slice().windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_known_lower_values() {
        // ratio = 10^(1/7)
        let bounds = BucketBounds::latency();
        assert_eq!(&bounds.as_slice()[..3], &[1000, 1389, 1931]);
    }

    #[test]
    fn test_odd_count_gives_upper_half_the_extra() {
        let bounds = BucketBounds::with_expected_median(10, 100, 10_000, 5).unwrap();
        assert_eq!(bounds.len(), 5);
        assert_eq!(bounds.as_slice(), &[10, 100, 464, 2154, 10_000]);
    }

    #[test]
    fn test_minimum_count() {
        let bounds = BucketBounds::with_expected_median(10, 100, 1000, 2).unwrap();
        assert_eq!(bounds.as_slice(), &[100, 1000]);
    }

    #[test]
    fn test_degenerate_range_is_non_decreasing() {
        let bounds = BucketBounds::with_expected_median(50, 50, 50, 4).unwrap();
        assert_eq!(bounds.as_slice(), &[50, 50, 50, 50]);
        assert_eq!(bounds.find_bucket(50), Some(0));
        assert_eq!(bounds.find_bucket(51), None);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            BucketBounds::with_expected_median(0, 10, 100, 4),
            Err(Error::InvalidBucketRange { .. })
        ));
        assert!(matches!(
            BucketBounds::with_expected_median(20, 10, 100, 4),
            Err(Error::InvalidBucketRange { .. })
        ));
        assert!(matches!(
            BucketBounds::with_expected_median(1, 200, 100, 4),
            Err(Error::InvalidBucketRange { .. })
        ));
        assert!(matches!(
            BucketBounds::with_expected_median(1, 10, 100, 1),
            Err(Error::InvalidBucketCount(1))
        ));
    }

    #[test]
    fn test_find_bucket_smallest_bound_at_or_above() {
        let bounds = BucketBounds::latency();
        let slice = bounds.as_slice();

        assert_eq!(bounds.find_bucket(0), Some(0));
        assert_eq!(bounds.find_bucket(1000), Some(0));
        assert_eq!(bounds.find_bucket(1001), Some(1));

        for (i, &bound) in slice.iter().enumerate() {
            assert_eq!(bounds.find_bucket(bound), Some(i));
            if i + 1 < slice.len() {
                assert_eq!(bounds.find_bucket(bound + 1), Some(i + 1));
            }
        }
    }

    #[test]
    fn test_find_bucket_overflow() {
        let bounds = BucketBounds::latency();
        assert_eq!(bounds.find_bucket(DEFAULT_MAX_MICROS), Some(bounds.len() - 1));
        assert_eq!(bounds.find_bucket(DEFAULT_MAX_MICROS + 1), None);
        assert_eq!(bounds.find_bucket(u64::MAX), None);
    }

    #[test]
    fn test_find_bucket_matches_linear_scan() {
        let bounds = BucketBounds::with_expected_median(3, 70, 9_000, 11).unwrap();
        for value in 0..=9_100u64 {
            let expected = bounds.iter().position(|bound| bound >= value);
            assert_eq!(bounds.find_bucket(value), expected, "value {value}");
        }
    }
}
