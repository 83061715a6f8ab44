//! Market snapshot rendering.
//!
//! Maps every [`SchemaFactor`] of one `(sample, date)` to the valuation
//! service's market key grammar:
//!
//! | Scenario factor                 | Market key                                     |
//! |---------------------------------|------------------------------------------------|
//! | `DiscountCurve/<CCY>/<i>`       | `DISCOUNT/RATE/<CCY>/<CCY>/<tenor>`            |
//! | `IndexCurve/<INDEX>/<i>`        | `DISCOUNT/RATE/<CCY>/<INDEX>/<tenor>`          |
//! | `FXSpot/<CCY><BASE>/0`          | `FX/RATE/<CCY>/<BASE>` and `FX/RATE/<BASE>/<CCY>` |
//! | `FXVolatility/<CCY><BASE>/<i>`  | `FX_OPTION/RATE_LNVOL/<CCY>/<BASE>/<expiry>/ATM` |
//! | `SwaptionVolatility/<CCY>/<k>`  | `SWAPTION/RATE_NVOL/<CCY>/<expiry>/<term>/ATM` |
//!
//! This module is the only place that knows the market key grammar.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use scenario_core::schema::SchemaFactor;
use scenario_core::types::{Date, DateGrid, DateIndex, SampleIndex, SnapshotError};
use scenario_core::{RiskFactorSchema, ScenarioStore};

/// One `(asof, key, value)` market line.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketQuote {
    /// Market key
    pub key: String,
    /// Quote value
    pub value: f64,
}

/// Every market quote of one `(sample, date)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    /// Sample
    pub sample: SampleIndex,
    /// Date index
    pub date: DateIndex,
    /// Calendar as-of date
    pub asof: Date,
    /// Quotes in schema order
    pub quotes: Vec<MarketQuote>,
}

impl MarketSnapshot {
    /// Writes `<YYYY-MM-DD> <key> <value>` lines.
    pub fn write_lines<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for quote in &self.quotes {
            writeln!(out, "{} {} {}", self.asof, quote.key, quote.value)?;
        }
        Ok(())
    }
}

/// Resolves a date index on the simulation grid.
pub fn grid_date(
    grid: &DateGrid,
    t0: Date,
    sample: SampleIndex,
    date: DateIndex,
) -> Result<Date, SnapshotError> {
    grid.date(t0, date)
        .map_err(|source| SnapshotError::Date {
            sample,
            date,
            source,
        })?
        .ok_or(SnapshotError::DateOutsideGrid {
            sample,
            date,
            grid_len: grid.len(),
        })
}

/// Renders market snapshots from a scenario dump.
#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshotBuilder<'a> {
    schema: &'a RiskFactorSchema,
    store: &'a ScenarioStore,
    t0: Date,
}

impl<'a> MarketSnapshotBuilder<'a> {
    /// Creates a builder for dates relative to `t0`.
    pub fn new(schema: &'a RiskFactorSchema, store: &'a ScenarioStore, t0: Date) -> Self {
        Self { schema, store, t0 }
    }

    /// Calendar date of `date` on the simulation grid.
    pub fn asof(&self, sample: SampleIndex, date: DateIndex) -> Result<Date, SnapshotError> {
        grid_date(self.schema.grid(), self.t0, sample, date)
    }

    /// Renders every schema factor for `(sample, date)`.
    ///
    /// # Errors
    ///
    /// `SnapshotError::MissingFactor` for the first schema factor without a
    /// scenario value; `SnapshotError::ZeroFxSpot` when a spot has no
    /// reciprocal.
    pub fn build(&self, sample: SampleIndex, date: DateIndex) -> Result<MarketSnapshot, SnapshotError> {
        let asof = self.asof(sample, date)?;
        let series = self.store.factor_series(sample, date);
        let factors = self.schema.factors();
        let mut quotes = Vec::with_capacity(factors.len() + self.schema.currencies().len());

        for factor in &factors {
            let scenario_key = factor.scenario_key();
            let value = series
                .and_then(|s| s.get(&scenario_key))
                .ok_or_else(|| SnapshotError::MissingFactor {
                    sample,
                    date,
                    key: scenario_key.clone(),
                })?;

            match *factor {
                SchemaFactor::Discount { currency, tenor, .. } => quotes.push(MarketQuote {
                    key: format!("DISCOUNT/RATE/{}/{}/{}", currency, currency, tenor),
                    value,
                }),
                SchemaFactor::IndexCurve { index, tenor, .. } => quotes.push(MarketQuote {
                    key: format!("DISCOUNT/RATE/{}/{}/{}", index_currency(index), index, tenor),
                    value,
                }),
                SchemaFactor::FxSpot { currency, base } => {
                    if value == 0.0 {
                        return Err(SnapshotError::ZeroFxSpot {
                            sample,
                            date,
                            key: scenario_key,
                        });
                    }
                    quotes.push(MarketQuote {
                        key: format!("FX/RATE/{}/{}", currency, base),
                        value,
                    });
                    quotes.push(MarketQuote {
                        key: format!("FX/RATE/{}/{}", base, currency),
                        value: 1.0 / value,
                    });
                }
                SchemaFactor::FxVolatility {
                    currency,
                    base,
                    expiry,
                    ..
                } => quotes.push(MarketQuote {
                    key: format!("FX_OPTION/RATE_LNVOL/{}/{}/{}/ATM", currency, base, expiry),
                    value,
                }),
                SchemaFactor::SwaptionVolatility {
                    currency,
                    expiry,
                    term,
                    ..
                } => quotes.push(MarketQuote {
                    key: format!("SWAPTION/RATE_NVOL/{}/{}/{}/ATM", currency, expiry, term),
                    value,
                }),
            }
        }

        Ok(MarketSnapshot {
            sample,
            date,
            asof,
            quotes,
        })
    }
}

/// Currency prefix of an index name (`EUR-EURIBOR-6M` → `EUR`).
fn index_currency(index: &str) -> &str {
    index.split('-').next().unwrap_or(index)
}

/// Per-sample accumulating market data file.
#[derive(Debug, Clone)]
pub struct MarketDataFile {
    path: PathBuf,
}

impl MarketDataFile {
    /// Binds to `path`; nothing is written yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncates the file, creating it if needed.
    pub fn clear(&self) -> io::Result<()> {
        File::create(&self.path).map(|_| ())
    }

    /// Appends the lines of `snapshot`.
    pub fn append(&self, snapshot: &MarketSnapshot) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut out = BufWriter::new(file);
        snapshot.write_lines(&mut out)?;
        out.flush()
    }
}
