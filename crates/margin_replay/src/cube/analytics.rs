//! Read-side cube views.
//!
//! The cube is treated as an unordered multiset; every view here imposes
//! its own deterministic order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use scenario_core::types::{Date, SampleIndex};
use serde::Serialize;

use super::{CubeError, CubeRow, MarginDepth};

/// Horizon cut-off for evolution views, in years from t0.
pub const EVOLUTION_HORIZON: f64 = 10.1;

/// Anything that yields cube rows.
pub trait CubeSource {
    /// Every row of the cube.
    fn rows(&self) -> Result<Vec<CubeRow>, CubeError>;
}

impl CubeSource for [CubeRow] {
    fn rows(&self) -> Result<Vec<CubeRow>, CubeError> {
        Ok(self.to_vec())
    }
}

impl CubeSource for Vec<CubeRow> {
    fn rows(&self) -> Result<Vec<CubeRow>, CubeError> {
        Ok(self.clone())
    }
}

/// Cube file written by [`super::CubeWriter`].
#[derive(Debug, Clone)]
pub struct CsvCube {
    path: PathBuf,
}

impl CsvCube {
    /// Binds to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cube file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CubeSource for CsvCube {
    fn rows(&self) -> Result<Vec<CubeRow>, CubeError> {
        let path = self.path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| CubeError::Csv {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let rows = reader
            .deserialize()
            .collect::<Result<Vec<CubeRow>, _>>()
            .map_err(|e| CubeError::Csv {
                path: path.clone(),
                message: e.to_string(),
            })?;
        tracing::debug!(path = %path, rows = rows.len(), "Loaded cube");
        Ok(rows)
    }
}

/// Rows of one sample and depth inside the horizon, ordered by time.
pub fn evolution_for_sample(rows: &[CubeRow], sample: SampleIndex, depth: MarginDepth) -> Vec<CubeRow> {
    let mut out: Vec<CubeRow> = rows
        .iter()
        .filter(|r| r.sample == sample && r.depth == depth && r.time < EVOLUTION_HORIZON)
        .cloned()
        .collect();
    out.sort_by(|a, b| a.time.total_cmp(&b.time).then_with(|| a.asof.cmp(&b.asof)));
    out
}

/// Cross-sample mean of one `(portfolio, depth, asof, currency, side)` cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectedRow {
    /// Portfolio
    #[serde(rename = "Portfolio")]
    pub portfolio: String,
    /// Depth
    #[serde(rename = "Depth")]
    pub depth: MarginDepth,
    /// Valuation date
    #[serde(rename = "AsOfDate")]
    pub asof: Date,
    /// Years from t0
    #[serde(rename = "Time")]
    pub time: f64,
    /// Margin currency
    #[serde(rename = "Currency")]
    pub currency: String,
    /// SIMM side
    #[serde(rename = "SimmSide")]
    pub side: String,
    /// Margin type label
    #[serde(rename = "MarginType")]
    pub margin_type: String,
    /// Mean normalised margin
    #[serde(rename = "ExpectedMargin")]
    pub margin: f64,
    /// Number of samples averaged
    #[serde(rename = "Samples")]
    pub samples: usize,
}

type CellKey = (String, MarginDepth, Date, String, String);

#[derive(Default)]
struct Cell {
    time: f64,
    margin_type: String,
    sum: f64,
    count: usize,
}

/// Expected margin profile across samples.
///
/// Rows are grouped by `(portfolio, depth, asof, currency, side)`; the
/// output is ordered by portfolio, depth, then time.
pub fn expected_evolution(rows: &[CubeRow]) -> Vec<ExpectedRow> {
    let mut cells: BTreeMap<CellKey, Cell> = BTreeMap::new();
    for row in rows {
        let key = (
            row.portfolio.clone(),
            row.depth,
            row.asof,
            row.currency.clone(),
            row.side.clone(),
        );
        let cell = cells.entry(key).or_insert_with(|| Cell {
            time: row.time,
            margin_type: row.margin_type.clone(),
            ..Cell::default()
        });
        cell.sum += row.margin;
        cell.count += 1;
    }

    let mut out: Vec<ExpectedRow> = cells
        .into_iter()
        .map(|((portfolio, depth, asof, currency, side), cell)| ExpectedRow {
            portfolio,
            depth,
            asof,
            time: cell.time,
            currency,
            side,
            margin_type: cell.margin_type,
            margin: cell.sum / cell.count as f64,
            samples: cell.count,
        })
        .collect();
    out.sort_by(|a, b| {
        a.portfolio
            .cmp(&b.portfolio)
            .then(a.depth.cmp(&b.depth))
            .then(a.time.total_cmp(&b.time))
            .then(a.asof.cmp(&b.asof))
            .then_with(|| a.currency.cmp(&b.currency))
            .then_with(|| a.side.cmp(&b.side))
    });
    out
}
