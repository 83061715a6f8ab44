//! # scenario_core: Scenario Foundation for Margin Replay
//!
//! ## Layer 1 (Foundation) Role
//!
//! scenario_core is the bottom layer of the benchmark workspace. It knows
//! nothing about the valuation service; it only turns the artefacts of a
//! Monte-Carlo simulation run into typed, read-only values:
//! - Time types: `Date`, `Tenor`, `DateGrid` and the 365.25-day year (`types::time`)
//! - Index conventions: `SampleIndex`, `DateIndex`, the aggregation-file shift (`types::index`)
//! - The simulated market description: `RiskFactorSchema` (`schema`)
//! - Scenario dump decoding: `ScenarioStore` (`scenario::store`)
//! - Aggregation scenario decoding: `AggregationData` (`scenario::aggregation`)
//! - Error types: `SchemaError`, `ParseError`, `OrderingError`, `SnapshotError` (`types::error`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use scenario_core::schema::RiskFactorSchema;
//! use scenario_core::scenario::ScenarioStore;
//! use scenario_core::types::{DateIndex, SampleIndex};
//!
//! let schema = RiskFactorSchema::builder()
//!     .currencies(["EUR"])
//!     .curve_tenors(["1Y"])
//!     .grid_spec("2,1Y")
//!     .build()
//!     .unwrap();
//!
//! let dump = "#Date,Sample,Key,Value\n1,1,DiscountCurve/EUR/0,0.98\n";
//! let store = ScenarioStore::from_reader("dump.csv", dump.as_bytes()).unwrap();
//!
//! for key in schema.factor_keys() {
//!     assert!(store.value(SampleIndex::new(1), DateIndex::new(1), &key).is_some());
//! }
//! ```

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod scenario;
pub mod schema;
pub mod types;

pub use scenario::{AggregationData, AggregationError, FactorSeries, ScenarioStore};
pub use schema::{RiskFactorSchema, SchemaFactor};
pub use types::{
    Date, DateError, DateGrid, DateIndex, OrderingError, ParseError, SampleIndex, SchemaError,
    SnapshotError, Tenor,
};
