//! CLI error types.

use margin_replay::config::ConfigError;
use margin_replay::cube::CubeError;
use margin_replay::error::RunError;
use thiserror::Error;

/// Result alias for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors reported by `margin-bench`.
#[derive(Debug, Error)]
pub enum CliError {
    /// A required file does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A flag value was rejected
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be loaded or validated
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The replay run stopped
    #[error(transparent)]
    Run(#[from] RunError),

    /// The cube could not be read
    #[error("Cube error: {0}")]
    Cube(#[from] CubeError),

    /// Some samples failed in strict mode
    #[error("{failed} of {requested} samples failed")]
    Incomplete {
        /// Failed samples
        failed: usize,
        /// Requested samples
        requested: usize,
    },

    /// Output could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON output failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
