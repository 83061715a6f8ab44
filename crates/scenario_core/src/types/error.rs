//! Error types for structured error handling.
//!
//! This module provides:
//! - `DateError`: Errors from date, tenor and grid parsing
//! - `SchemaError`: Simulation configuration lacking required structure
//! - `ParseError`: Malformed scenario file rows, always with line context
//! - `OrderingError`: Aggregation rows citing an undeclared factor key
//! - `SnapshotError`: Schema/scenario mismatch for a given sample and date

use thiserror::Error;

use super::index::{DateIndex, SampleIndex};

/// Date-related errors.
///
/// # Examples
/// ```
/// use scenario_core::types::error::DateError;
///
/// let err = DateError::InvalidDate { year: 2025, month: 2, day: 30 };
/// assert_eq!(format!("{}", err), "Invalid date: 2025-2-30");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    /// Invalid date components (e.g., February 30th).
    #[error("Invalid date: {year}-{month}-{day}")]
    InvalidDate {
        /// Year component
        year: i32,
        /// Month component (1-12)
        month: u32,
        /// Day component (1-31)
        day: u32,
    },

    /// Failed to parse date string.
    #[error("Date parse error: {0}")]
    ParseError(String),

    /// Failed to parse a tenor such as `3M`.
    #[error("Invalid tenor: '{0}'")]
    InvalidTenor(String),

    /// Failed to parse a date grid specification.
    #[error("Invalid date grid: '{0}'")]
    InvalidGrid(String),

    /// Date arithmetic left chrono's representable range.
    #[error("Date out of range: {0}")]
    OutOfRange(String),
}

/// Simulation configuration lacks or misstates required structure.
///
/// Fatal for the whole run.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A required node is absent from the configuration document.
    #[error("Missing required configuration node: {0}")]
    MissingNode(String),

    /// The document is not well-formed XML.
    #[error("Malformed simulation configuration: {0}")]
    Xml(String),

    /// A list entry could not be interpreted.
    #[error("Invalid entry '{value}' in {node}: {reason}")]
    InvalidEntry {
        /// Node path the entry came from
        node: String,
        /// Offending entry
        value: String,
        /// What was wrong with it
        reason: String,
    },

    /// The simulated market declares no currency.
    #[error("Simulation configuration declares no currencies")]
    NoCurrencies,

    /// The base currency is not among the simulated currencies.
    #[error("Base currency {0} is not a simulated currency")]
    UnknownBaseCurrency(String),

    /// The configuration document could not be read.
    #[error("Cannot read simulation configuration {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Malformed scenario file content.
///
/// Fatal for the file being parsed; no partial recovery of a bad line.
///
/// # Examples
/// ```
/// use scenario_core::types::error::ParseError;
///
/// let err = ParseError::ColumnCount { path: "dump.csv".into(), line: 7, expected: 4, found: 3 };
/// assert_eq!(format!("{}", err), "dump.csv:7: expected 4 columns, found 3");
/// ```
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file could not be opened or read.
    #[error("{path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The delimited reader rejected the input.
    #[error("{path}:{line}: {message}")]
    Csv {
        /// File path
        path: String,
        /// 1-based line number
        line: u64,
        /// Reader diagnostic
        message: String,
    },

    /// A data row has the wrong number of columns.
    #[error("{path}:{line}: expected {expected} columns, found {found}")]
    ColumnCount {
        /// File path
        path: String,
        /// 1-based line number
        line: u64,
        /// Expected column count
        expected: usize,
        /// Actual column count
        found: usize,
    },

    /// A column could not be converted to its type.
    #[error("{path}:{line}: invalid {field} '{value}'")]
    InvalidField {
        /// File path
        path: String,
        /// 1-based line number
        line: u64,
        /// Column name
        field: &'static str,
        /// Raw text
        value: String,
    },

    /// Second record for the same (date, sample, key).
    #[error("{path}:{line}: duplicate record for date {date}, sample {sample}, key {key}")]
    Duplicate {
        /// File path
        path: String,
        /// 1-based line number
        line: u64,
        /// Date index
        date: DateIndex,
        /// Sample column as written in the file
        sample: u32,
        /// Factor key
        key: String,
    },
}

/// An aggregation data row cites a factor key that has not been declared yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}:{line}: factor key {key} used before its declaration")]
pub struct OrderingError {
    /// File path
    pub path: String,
    /// 1-based line number of the data row
    pub line: u64,
    /// Undeclared integer key
    pub key: u32,
}

/// The schema and the scenario data disagree for a sample/date.
///
/// Fatal for that sample: a partial snapshot would bias the benchmark.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A factor implied by the schema has no scenario value.
    #[error("sample {sample}, date index {date}: missing scenario factor {key}")]
    MissingFactor {
        /// Sample being rendered
        sample: SampleIndex,
        /// Date being rendered
        date: DateIndex,
        /// Missing factor key
        key: String,
    },

    /// The date index lies beyond the simulation grid.
    #[error("sample {sample}, date index {date}: outside the {grid_len}-date simulation grid")]
    DateOutsideGrid {
        /// Sample being rendered
        sample: SampleIndex,
        /// Offending date index
        date: DateIndex,
        /// Number of grid dates
        grid_len: usize,
    },

    /// An FX spot of zero has no reciprocal.
    #[error("sample {sample}, date index {date}: zero FX spot {key}")]
    ZeroFxSpot {
        /// Sample being rendered
        sample: SampleIndex,
        /// Date being rendered
        date: DateIndex,
        /// FX spot factor key
        key: String,
    },

    /// The sample has no row in the 0-based aggregation file.
    #[error("sample {sample} has no aggregation scenario row")]
    NoAggregationRow {
        /// Offending sample
        sample: SampleIndex,
    },

    /// The aggregation data carries two numeraire values for one date.
    #[error("sample {sample}, date index {date}: more than one numeraire value")]
    DuplicateNumeraire {
        /// Sample being rendered
        sample: SampleIndex,
        /// Date carrying the second value
        date: DateIndex,
    },

    /// Grid date arithmetic failed.
    #[error("sample {sample}, date index {date}: {source}")]
    Date {
        /// Sample being rendered
        sample: SampleIndex,
        /// Date being rendered
        date: DateIndex,
        /// Underlying date error
        #[source]
        source: DateError,
    },
}
