//! latop CLI - replay recorded operations into a usage registry and dump
//! the resulting latency report.

pub mod config;
pub mod error;
pub mod replay;

pub use config::{Args, OutputFormat};
pub use error::CliError;
pub use replay::{apply, render, replay, Operation, ReplaySummary};
