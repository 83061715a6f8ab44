//! Benchmark cube: normalised margin rows and their persistence.
//!
//! - [`CubeRow`] / [`MarginDepth`]: one cube entry and its decomposition tag
//! - [`CubeAggregator`]: reports + numeraire → cube rows
//! - [`CubeWriter`]: append-only CSV persistence
//! - [`analytics`]: per-sample evolution and cross-sample expectation
//!
//! The cube is an unordered multiset keyed by
//! `(portfolio, sample, asof, depth, margin_type, side)`; write order carries
//! no meaning.

mod aggregator;
pub mod analytics;
mod error;
mod writer;

pub use aggregator::{CubeAggregator, DateRows, SkipReason};
pub use error::CubeError;
pub use writer::CubeWriter;

use std::fmt;
use std::str::FromStr;

use scenario_core::types::{Date, SampleIndex};
use serde::{Deserialize, Serialize};

/// Margin decomposition component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MarginDepth {
    /// Total margin
    All = 0,
    /// Delta margin
    Delta = 1,
    /// Vega margin
    Vega = 2,
    /// Curvature margin
    Curvature = 3,
    /// Diagnostic netting-set NPV
    Npv = 4,
}

impl MarginDepth {
    /// Every depth, in code order.
    pub const ALL: [MarginDepth; 5] = [
        MarginDepth::All,
        MarginDepth::Delta,
        MarginDepth::Vega,
        MarginDepth::Curvature,
        MarginDepth::Npv,
    ];

    /// Integer code stored in the cube.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// `MarginType` label, as used in the margin report and the cube.
    pub fn label(self) -> &'static str {
        match self {
            MarginDepth::All => "All",
            MarginDepth::Delta => "Delta",
            MarginDepth::Vega => "Vega",
            MarginDepth::Curvature => "Curvature",
            MarginDepth::Npv => "NPV",
        }
    }
}

impl From<MarginDepth> for u8 {
    fn from(depth: MarginDepth) -> u8 {
        depth.code()
    }
}

impl TryFrom<u8> for MarginDepth {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        MarginDepth::ALL
            .into_iter()
            .find(|d| d.code() == code)
            .ok_or_else(|| format!("unknown margin depth {}", code))
    }
}

impl FromStr for MarginDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return MarginDepth::try_from(code);
        }
        MarginDepth::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown margin depth '{}'", s))
    }
}

impl fmt::Display for MarginDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One cube entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeRow {
    /// Portfolio (netting set) identifier
    #[serde(rename = "Portfolio")]
    pub portfolio: String,
    /// 1-based sample
    #[serde(rename = "Sample")]
    pub sample: SampleIndex,
    /// Valuation date
    #[serde(rename = "AsOfDate")]
    pub asof: Date,
    /// Years from t0 on a 365.25-day year
    #[serde(rename = "Time")]
    pub time: f64,
    /// Numeraire-normalised margin
    #[serde(rename = "InitialMargin")]
    pub margin: f64,
    /// Margin currency
    #[serde(rename = "Currency")]
    pub currency: String,
    /// SIMM side, e.g. `Call`
    #[serde(rename = "SimmSide")]
    pub side: String,
    /// Decomposition depth
    #[serde(rename = "Depth")]
    pub depth: MarginDepth,
    /// Margin type label
    #[serde(rename = "MarginType")]
    pub margin_type: String,
}
