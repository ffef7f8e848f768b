//! CLI error types.

use thiserror::Error;

/// Errors raised while replaying operations.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An input line is not a valid operation.
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Registry construction or report rendering failed.
    #[error(transparent)]
    Core(#[from] latop_core::Error),
}
