//! Replay and run error types.
//!
//! Component errors are collected into [`ReplayErrorKind`]; a
//! [`ReplayError`] pins one of them to the sample and as-of date that was in
//! flight. [`RunError`] covers failures that stop a whole batch run.

use std::fmt;

use scenario_core::scenario::AggregationError;
use scenario_core::types::{Date, ParseError, SampleIndex, SchemaError, SnapshotError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::cube::CubeError;
use crate::valuation::ValuationError;

/// What went wrong while replaying one sample.
#[derive(Debug, Error)]
pub enum ReplayErrorKind {
    /// Schema and scenario data disagree
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Malformed scenario data
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Malformed aggregation data
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// The valuation service failed
    #[error(transparent)]
    Valuation(#[from] ValuationError),

    /// Normalisation or cube IO failed
    #[error(transparent)]
    Cube(#[from] CubeError),

    /// Scratch file IO failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A sample replay failure with its sample and as-of context.
///
/// # Examples
///
/// ```
/// use margin_replay::error::{ReplayError, ReplayErrorKind};
/// use scenario_core::types::{Date, SampleIndex, SnapshotError};
///
/// let err = ReplayError::new(
///     SampleIndex::new(4),
///     Date::from_ymd(2025, 7, 1).ok(),
///     SnapshotError::NoAggregationRow { sample: SampleIndex::new(4) },
/// );
/// assert!(err.to_string().starts_with("sample 4 as of 2025-07-01:"));
/// ```
#[derive(Debug)]
pub struct ReplayError {
    /// Sample being replayed
    pub sample: SampleIndex,
    /// As-of date in flight, `None` before the first date
    pub asof: Option<Date>,
    /// Underlying failure
    pub kind: ReplayErrorKind,
}

impl ReplayError {
    /// Pins `kind` to a sample and as-of date.
    pub fn new(sample: SampleIndex, asof: Option<Date>, kind: impl Into<ReplayErrorKind>) -> Self {
        Self {
            sample,
            asof,
            kind: kind.into(),
        }
    }
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.asof {
            Some(asof) => write!(f, "sample {} as of {}: {}", self.sample, asof, self.kind),
            None => write!(f, "sample {} before first date: {}", self.sample, self.kind),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Failure that stops a whole benchmark run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Run configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Simulation configuration rejected
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Scenario dump rejected
    #[error("Scenario dump error: {0}")]
    Parse(#[from] ParseError),

    /// Aggregation file rejected
    #[error("Aggregation data error: {0}")]
    Aggregation(#[from] AggregationError),

    /// Job descriptor unusable
    #[error("Valuation setup error: {0}")]
    Valuation(#[from] ValuationError),

    /// Cube could not be reset or written
    #[error("Cube error: {0}")]
    Cube(#[from] CubeError),

    /// Worker pool could not be created
    #[error("Worker pool error: {0}")]
    Pool(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenario_core::types::DateIndex;

    #[test]
    fn test_replay_error_names_sample_and_asof() {
        let err = ReplayError::new(
            SampleIndex::new(2),
            Date::from_ymd(2026, 1, 1).ok(),
            SnapshotError::MissingFactor {
                sample: SampleIndex::new(2),
                date: DateIndex::new(4),
                key: "FXSpot/USDEUR/0".to_string(),
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("sample 2 as of 2026-01-01"));
        assert!(msg.contains("FXSpot/USDEUR/0"));
    }

    #[test]
    fn test_replay_error_without_asof() {
        let err = ReplayError::new(
            SampleIndex::new(1),
            None,
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert!(err.to_string().contains("before first date"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
