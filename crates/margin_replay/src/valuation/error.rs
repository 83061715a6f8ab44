//! Valuation service error types.

use thiserror::Error;

/// Failure of the valuation seam: descriptor editing, invocation or report
/// reading.
#[derive(Debug, Error)]
pub enum ValuationError {
    /// The program could not be launched.
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        /// Program
        program: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The program ran but reported failure.
    #[error("{program} exited with {status}")]
    ExitStatus {
        /// Program
        program: String,
        /// Exit status as reported by the OS
        status: String,
    },

    /// The program outlived its timeout and was killed.
    #[error("{program} did not finish within {timeout_secs}s")]
    Timeout {
        /// Program
        program: String,
        /// Configured timeout
        timeout_secs: u64,
    },

    /// The job descriptor lacks a parameter this core must set or read.
    #[error("Job descriptor {path}: no parameter '{name}'")]
    MissingParameter {
        /// Descriptor path
        path: String,
        /// Parameter name
        name: String,
    },

    /// The descriptor reads a scratch file other than the one the replay
    /// writes.
    #[error("Job descriptor {path}: '{name}' is {descriptor}, but the replay writes {configured}")]
    ScratchPathMismatch {
        /// Descriptor path
        path: String,
        /// Parameter name
        name: String,
        /// Value in the descriptor
        descriptor: String,
        /// Configured scratch file
        configured: String,
    },

    /// The job descriptor is malformed or its content is unusable.
    #[error("Job descriptor {path}: {message}")]
    Descriptor {
        /// Descriptor path
        path: String,
        /// Diagnostic
        message: String,
    },

    /// A report exists but cannot be read.
    #[error("Report {path}: {message}")]
    Report {
        /// Report path
        path: String,
        /// Diagnostic
        message: String,
    },

    /// File IO around the invocation failed.
    #[error("{path}: {source}")]
    Io {
        /// Path involved
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl ValuationError {
    /// Create an IO error for `path`
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Create a report error for `path`
    pub fn report(path: &str, message: impl Into<String>) -> Self {
        Self::Report {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
