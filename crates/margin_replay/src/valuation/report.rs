//! Margin and NPV report decoding.
//!
//! Both reports are CSV files whose header line may start with `#`:
//!
//! ```text
//! #Portfolio,ProductClass,RiskClass,MarginType,Bucket,SimmSide,InitialMargin,Currency
//! CPTY_A,All,All,All,All,Call,125000.5,EUR
//! ```
//!
//! Unknown columns are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ValuationError;

/// Dimension label selecting the aggregate level.
pub const ALL: &str = "All";
/// SIMM side recorded in the benchmark.
pub const CALL: &str = "Call";

/// One row of the margin report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarginReportRow {
    /// Portfolio (netting set)
    #[serde(rename = "Portfolio")]
    pub portfolio: String,
    /// Product class label
    #[serde(rename = "ProductClass")]
    pub product_class: String,
    /// Risk class label
    #[serde(rename = "RiskClass")]
    pub risk_class: String,
    /// Margin type label
    #[serde(rename = "MarginType")]
    pub margin_type: String,
    /// Bucket label
    #[serde(rename = "Bucket")]
    pub bucket: String,
    /// SIMM side
    #[serde(rename = "SimmSide")]
    pub side: String,
    /// Raw (undiscounted) initial margin
    #[serde(rename = "InitialMargin")]
    pub initial_margin: f64,
    /// Margin currency
    #[serde(rename = "Currency")]
    pub currency: String,
}

/// Parsed margin report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarginReport {
    rows: Vec<MarginReportRow>,
}

impl MarginReport {
    /// Reads a report file.
    pub fn from_path(path: &Path) -> Result<Self, ValuationError> {
        let file = File::open(path).map_err(|e| ValuationError::io(path, e))?;
        Self::from_reader(&path.display().to_string(), file)
    }

    /// Reads a report from any reader; `name` is used in errors.
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, ValuationError> {
        Ok(Self {
            rows: read_rows(name, reader)?,
        })
    }

    /// Builds a report from rows.
    pub fn from_rows(rows: Vec<MarginReportRow>) -> Self {
        Self { rows }
    }

    /// All rows.
    pub fn rows(&self) -> &[MarginReportRow] {
        &self.rows
    }

    /// The aggregate row of `portfolio` for `margin_type`: product class,
    /// risk class and bucket `All`, side `Call`.
    pub fn select(&self, portfolio: &str, margin_type: &str) -> Option<&MarginReportRow> {
        self.rows.iter().find(|row| {
            row.portfolio == portfolio
                && row.margin_type == margin_type
                && row.product_class == ALL
                && row.risk_class == ALL
                && row.bucket == ALL
                && row.side == CALL
        })
    }
}

/// One trade of the NPV report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NpvTrade {
    /// Trade identifier
    #[serde(rename = "TradeId")]
    pub trade_id: String,
    /// NPV in base currency
    #[serde(rename = "NPV(Base)")]
    pub npv_base: f64,
    /// Base currency
    #[serde(rename = "BaseCurrency")]
    pub base_currency: String,
    /// Netting set the trade belongs to
    #[serde(rename = "NettingSet")]
    pub netting_set: String,
}

/// Parsed NPV report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NpvReport {
    trades: Vec<NpvTrade>,
}

/// Netting-set NPV aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct NettingSetNpv {
    /// Plain sum of `NPV(Base)`
    pub total: f64,
    /// Base currency of the first matching trade
    pub currency: String,
    /// Number of trades summed
    pub trades: usize,
}

impl NpvReport {
    /// Reads a report file.
    pub fn from_path(path: &Path) -> Result<Self, ValuationError> {
        let file = File::open(path).map_err(|e| ValuationError::io(path, e))?;
        Self::from_reader(&path.display().to_string(), file)
    }

    /// Reads a report from any reader; `name` is used in errors.
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, ValuationError> {
        Ok(Self {
            trades: read_rows(name, reader)?,
        })
    }

    /// Builds a report from trades.
    pub fn from_trades(trades: Vec<NpvTrade>) -> Self {
        Self { trades }
    }

    /// All trades.
    pub fn trades(&self) -> &[NpvTrade] {
        &self.trades
    }

    /// Sum of `NPV(Base)` over the trades of `netting_set`; `None` when no
    /// trade matches.
    pub fn netting_set_total(&self, netting_set: &str) -> Option<NettingSetNpv> {
        let mut matching = self.trades.iter().filter(|t| t.netting_set == netting_set);
        let first = matching.next()?;
        let mut total = NettingSetNpv {
            total: first.npv_base,
            currency: first.base_currency.clone(),
            trades: 1,
        };
        for trade in matching {
            total.total += trade.npv_base;
            total.trades += 1;
        }
        Some(total)
    }
}

fn read_rows<R: Read, T: DeserializeOwned>(name: &str, reader: R) -> Result<Vec<T>, ValuationError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: StringRecord = reader
        .headers()
        .map_err(|e| ValuationError::report(name, e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('#').trim())
        .collect();
    reader.set_headers(headers);

    reader
        .deserialize()
        .map(|row| row.map_err(|e| ValuationError::report(name, e.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMM: &str = "\
#Portfolio,ProductClass,RiskClass,MarginType,Bucket,SimmSide,InitialMargin,Currency
CPTY_A,RatesFX,All,All,All,Call,900.0,EUR
CPTY_A,All,All,All,All,Call,1250.5,EUR
CPTY_A,All,All,Delta,All,Call,1000.0,EUR
CPTY_A,All,All,All,All,Post,1300.0,EUR
CPTY_B,All,All,All,All,Call,77.0,EUR
";

    const NPV: &str = "\
#TradeId,TradeType,Maturity,NPV,NpvCurrency,NPV(Base),BaseCurrency,NettingSet
T1,Swap,2030-01-01,10,EUR,10.5,EUR,CPTY_A
T2,Swap,2031-01-01,-3,USD,-2.5,EUR,CPTY_A
T3,Swap,2032-01-01,7,EUR,7.0,EUR,CPTY_B
";

    #[test]
    fn test_select_aggregate_call_row() {
        let report = MarginReport::from_reader("simm.csv", SIMM.as_bytes()).unwrap();
        assert_eq!(report.rows().len(), 5);
        let row = report.select("CPTY_A", "All").unwrap();
        assert_eq!(row.initial_margin, 1250.5);
        assert_eq!(report.select("CPTY_A", "Delta").unwrap().initial_margin, 1000.0);
        assert!(report.select("CPTY_A", "Vega").is_none());
        assert!(report.select("CPTY_C", "All").is_none());
    }

    #[test]
    fn test_header_without_marker() {
        let text = SIMM.trim_start_matches('#');
        let report = MarginReport::from_reader("simm.csv", text.as_bytes()).unwrap();
        assert!(report.select("CPTY_B", "All").is_some());
    }

    #[test]
    fn test_bad_margin_value() {
        let text = "Portfolio,ProductClass,RiskClass,MarginType,Bucket,SimmSide,InitialMargin,Currency\n\
                    CPTY_A,All,All,All,All,Call,n/a,EUR\n";
        assert!(matches!(
            MarginReport::from_reader("simm.csv", text.as_bytes()),
            Err(ValuationError::Report { .. })
        ));
    }

    #[test]
    fn test_netting_set_total() {
        let report = NpvReport::from_reader("npv.csv", NPV.as_bytes()).unwrap();
        let total = report.netting_set_total("CPTY_A").unwrap();
        approx::assert_relative_eq!(total.total, 8.0);
        assert_eq!(total.trades, 2);
        assert_eq!(total.currency, "EUR");
        assert!(report.netting_set_total("CPTY_Z").is_none());
    }
}
