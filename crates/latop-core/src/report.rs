//! Snapshot report types.
//!
//! These types are produced by [`UsageRegistry::snapshot`] and serialize to
//! the nested `latencyStats` document consumers diff across snapshots.
//! Resource keys are held in ordered maps so the rendered document is
//! always sorted lexicographically.
//!
//! [`UsageRegistry::snapshot`]: crate::UsageRegistry::snapshot

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::category::{CommandCategory, CommandGroup};
use crate::error::Result;

/// One histogram step in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
    /// Upper bound in microseconds.
    pub le: u64,
    /// Operations whose latency fell into this step.
    pub count: u64,
}

/// Serialized counters of one histogram.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramStats {
    /// Per-bucket counts, ascending by bound.
    pub histogram: Vec<BucketCount>,
    /// Sum of successful user latencies in microseconds.
    pub sum: u64,
    /// Successful user operations.
    pub count: u64,
    /// Failed user operations.
    pub errors: u64,
    /// Operations not issued by an external user.
    pub non_user_ops: u64,
}

impl HistogramStats {
    /// Mean successful latency in microseconds, 0 when empty.
    pub fn mean(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        self.sum / self.count
    }

    /// Approximate percentile (e.g. 0.50 for P50, 0.99 for P99).
    ///
    /// Returns the upper bound of the bucket containing the target rank.
    /// Successes above the largest bound count toward the rank, so a target
    /// landing among them reports the largest bound.
    pub fn percentile(&self, p: f64) -> u64 {
        if self.count == 0 {
            return 0;
        }

        let target = ((self.count as f64 * p).ceil() as u64).max(1);
        let mut cumulative = 0u64;

        for bucket in &self.histogram {
            cumulative += bucket.count;
            if cumulative >= target {
                return bucket.le;
            }
        }

        self.histogram.last().map(|bucket| bucket.le).unwrap_or(0)
    }

    /// Successful operations that exceeded every bound.
    pub fn overflow(&self) -> u64 {
        let bucketed: u64 = self.histogram.iter().map(|bucket| bucket.count).sum();
        self.count.saturating_sub(bucketed)
    }
}

/// Compact per-resource view: categories folded into read, write and other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedStats {
    pub read: HistogramStats,
    pub write: HistogramStats,
    pub other: HistogramStats,
}

impl GroupedStats {
    /// Stats of one group.
    pub fn get(&self, group: CommandGroup) -> &HistogramStats {
        match group {
            CommandGroup::Read => &self.read,
            CommandGroup::Write => &self.write,
            CommandGroup::Other => &self.other,
        }
    }
}

/// Detailed per-resource view: one entry per command category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerboseStats {
    pub insert: HistogramStats,
    pub find: HistogramStats,
    pub find_and_modify: HistogramStats,
    pub update: HistogramStats,
    pub delete: HistogramStats,
    pub aggregate: HistogramStats,
    pub distinct: HistogramStats,
    pub other: HistogramStats,
}

impl VerboseStats {
    /// Stats of one category.
    pub fn get(&self, category: CommandCategory) -> &HistogramStats {
        match category {
            CommandCategory::Insert => &self.insert,
            CommandCategory::Find => &self.find,
            CommandCategory::FindAndModify => &self.find_and_modify,
            CommandCategory::Update => &self.update,
            CommandCategory::Delete => &self.delete,
            CommandCategory::Aggregate => &self.aggregate,
            CommandCategory::Distinct => &self.distinct,
            CommandCategory::Other => &self.other,
        }
    }
}

/// Stats emitted under one top-level resource key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceStats {
    /// Compact view of a namespace or a whole database.
    Grouped(GroupedStats),
    /// Verbose view of a single namespace.
    Verbose(VerboseStats),
    /// Verbose view of every collection of a database, keyed by collection.
    Collections(BTreeMap<String, VerboseStats>),
}

/// A point-in-time latency report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LatencyReport {
    /// Stats keyed by database or namespace, sorted ascending.
    #[serde(rename = "latencyStats")]
    pub latency_stats: BTreeMap<String, ResourceStats>,
}

/// Prometheus metric family prefix.
const METRIC_PREFIX: &str = "latop_op_latency_us";

impl LatencyReport {
    /// Stats for a top-level key.
    pub fn get(&self, key: &str) -> Option<&ResourceStats> {
        self.latency_stats.get(key)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.latency_stats.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.latency_stats.is_empty()
    }

    /// Render as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Export to Prometheus text format.
    ///
    /// Buckets are emitted cumulatively as Prometheus expects. Series are
    /// labelled with `resource`, `collection` (verbose database reports
    /// only) and `op` (group or category name).
    pub fn to_prometheus(&self) -> String {
        let series = self.series();
        let mut out = String::new();

        out.push_str(&format!(
            "# HELP {METRIC_PREFIX} Successful user operation latency in microseconds\n"
        ));
        out.push_str(&format!("# TYPE {METRIC_PREFIX} histogram\n"));
        for (labels, stats) in &series {
            let mut cumulative = 0u64;
            for bucket in &stats.histogram {
                cumulative += bucket.count;
                let _ = writeln!(
                    out,
                    "{METRIC_PREFIX}_bucket{{{labels},le=\"{}\"}} {cumulative}",
                    bucket.le
                );
            }
            let _ = writeln!(out, "{METRIC_PREFIX}_bucket{{{labels},le=\"+Inf\"}} {}", stats.count);
            let _ = writeln!(out, "{METRIC_PREFIX}_sum{{{labels}}} {}", stats.sum);
            let _ = writeln!(out, "{METRIC_PREFIX}_count{{{labels}}} {}", stats.count);
        }
        out.push('\n');

        out.push_str("# HELP latop_op_errors_total Failed user operations\n");
        out.push_str("# TYPE latop_op_errors_total counter\n");
        for (labels, stats) in &series {
            let _ = writeln!(out, "latop_op_errors_total{{{labels}}} {}", stats.errors);
        }
        out.push('\n');

        out.push_str("# HELP latop_op_non_user_total Operations not issued by an external user\n");
        out.push_str("# TYPE latop_op_non_user_total counter\n");
        for (labels, stats) in &series {
            let _ = writeln!(out, "latop_op_non_user_total{{{labels}}} {}", stats.non_user_ops);
        }

        out
    }

    /// Flatten the report into labelled series, in report order.
    fn series(&self) -> Vec<(String, &HistogramStats)> {
        let mut series = Vec::new();

        for (resource, stats) in &self.latency_stats {
            let resource_label = format!("resource=\"{}\"", escape_label(resource));
            match stats {
                ResourceStats::Grouped(grouped) => {
                    for group in CommandGroup::ALL {
                        series.push((
                            format!("{resource_label},op=\"{group}\""),
                            grouped.get(group),
                        ));
                    }
                }
                ResourceStats::Verbose(verbose) => {
                    for category in CommandCategory::ALL {
                        series.push((
                            format!("{resource_label},op=\"{category}\""),
                            verbose.get(category),
                        ));
                    }
                }
                ResourceStats::Collections(collections) => {
                    for (collection, verbose) in collections {
                        for category in CommandCategory::ALL {
                            series.push((
                                format!(
                                    "{resource_label},collection=\"{}\",op=\"{category}\"",
                                    escape_label(collection)
                                ),
                                verbose.get(category),
                            ));
                        }
                    }
                }
            }
        }

        series
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
