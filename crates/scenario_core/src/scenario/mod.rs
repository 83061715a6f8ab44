//! Scenario file decoding.
//!
//! - [`ScenarioStore`]: the scenario dump, `(date, sample, key) → value`
//! - [`AggregationData`]: the aggregation scenario file with its factor
//!   dictionary
//!
//! Both accept plain or gzip-compressed input.

pub mod aggregation;
mod reader;
pub mod store;

pub use aggregation::{
    AggregationData, AggregationError, AggregationValue, FactorDeclaration, NUMERAIRE,
};
pub use store::{FactorSeries, ScenarioStore};
