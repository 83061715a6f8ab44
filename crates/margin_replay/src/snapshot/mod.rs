//! Valuation inputs rendered from scenario data.
//!
//! - `market`: one market snapshot per `(sample, date)`, appended to a
//!   per-sample market data file
//! - `fixing`: the fixing file and numeraire series of one sample

pub mod fixing;
pub mod market;

pub use fixing::{Fixing, FixingFile, FixingSnapshot, FixingSnapshotBuilder, NumeraireSeries};
pub use market::{MarketDataFile, MarketQuote, MarketSnapshot, MarketSnapshotBuilder};
