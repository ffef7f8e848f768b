//! Command-line configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use latop_core::buckets::{
    DEFAULT_BUCKET_COUNT, DEFAULT_MAX_MICROS, DEFAULT_MEDIAN_MICROS, DEFAULT_MIN_MICROS,
};
use latop_core::config::DEFAULT_SHARDS;
use latop_core::LatencyConfig;

/// Report rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single-line JSON.
    Json,
    /// Indented JSON.
    Pretty,
    /// Prometheus text exposition format.
    Prometheus,
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "latop")]
#[command(version, about = "Replay recorded operations and dump a latency report", long_about = None)]
pub struct Args {
    /// JSON-lines file of operations (reads stdin when absent).
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Emit per-collection, per-command detail.
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format.
    #[arg(long, default_value = "pretty", value_enum)]
    pub format: OutputFormat,

    /// Key histograms by full namespace instead of database/collection.
    #[arg(long)]
    pub flat: bool,

    /// Number of lock partitions.
    #[arg(long, default_value_t = DEFAULT_SHARDS)]
    pub shards: usize,

    /// Lowest bucket bound in microseconds.
    #[arg(long, default_value_t = DEFAULT_MIN_MICROS)]
    pub min_us: u64,

    /// Expected median latency in microseconds.
    #[arg(long, default_value_t = DEFAULT_MEDIAN_MICROS)]
    pub median_us: u64,

    /// Highest bucket bound in microseconds.
    #[arg(long, default_value_t = DEFAULT_MAX_MICROS)]
    pub max_us: u64,

    /// Number of histogram buckets.
    #[arg(long, default_value_t = DEFAULT_BUCKET_COUNT)]
    pub buckets: usize,
}

impl Args {
    /// Convert command-line arguments to registry configuration.
    pub fn to_config(&self) -> LatencyConfig {
        let config = LatencyConfig::new()
            .with_bucket_range(self.min_us, self.median_us, self.max_us)
            .with_bucket_count(self.buckets)
            .with_shards(self.shards);

        if self.flat {
            config.flat()
        } else {
            config
        }
    }
}
