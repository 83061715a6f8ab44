//! Cube error types.

use scenario_core::types::{Date, SampleIndex};
use thiserror::Error;

/// Failure while normalising, writing or reading the cube.
#[derive(Debug, Error)]
pub enum CubeError {
    /// The numeraire series has no value for the as-of date.
    #[error("sample {sample}: no numeraire for {asof}")]
    MissingNumeraire {
        /// Sample
        sample: SampleIndex,
        /// As-of date
        asof: Date,
    },

    /// A numeraire of zero cannot normalise.
    #[error("sample {sample}: zero numeraire for {asof}")]
    ZeroNumeraire {
        /// Sample
        sample: SampleIndex,
        /// As-of date
        asof: Date,
    },

    /// CSV encoding or decoding failed.
    #[error("{path}: {message}")]
    Csv {
        /// Cube file
        path: String,
        /// Diagnostic
        message: String,
    },

    /// The cube file could not be opened, written or removed.
    #[error("{path}: {source}")]
    Io {
        /// Cube file
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}
