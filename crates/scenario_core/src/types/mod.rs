//! Core time, index and error types.
//!
//! This module provides:
//! - `time`: `Date`, `Tenor`, `DateGrid` and [`time_from_t0`]
//! - `index`: sample and date index newtypes and the aggregation-file shift
//! - `error`: structured errors for schema, parse, ordering and snapshot failures

pub mod error;
pub mod index;
pub mod time;

pub use error::{DateError, OrderingError, ParseError, SchemaError, SnapshotError};
pub use index::{DateIndex, SampleIndex, AGGREGATION_SAMPLE_SHIFT};
pub use time::{time_from_t0, Date, DateGrid, Tenor, TenorUnit, DAYS_PER_YEAR};
