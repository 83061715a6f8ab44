//! Report → cube row normalisation.

use scenario_core::types::{time_from_t0, Date, SampleIndex};

use super::{CubeError, CubeRow, MarginDepth};
use crate::snapshot::NumeraireSeries;
use crate::valuation::{ValuationReports, CALL};

/// Why a date contributed fewer rows than selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The valuation produced no margin report.
    MissingReport,
    /// The margin report has no aggregate row for this depth.
    NoMatchingRow(MarginDepth),
}

/// Rows produced for one as-of date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateRows {
    /// Normalised rows
    pub rows: Vec<CubeRow>,
    /// Selected depths that produced nothing
    pub skipped: Vec<SkipReason>,
}

/// Normalises reports into cube rows for one portfolio.
///
/// # Examples
///
/// ```
/// use margin_replay::cube::{CubeAggregator, MarginDepth};
/// use margin_replay::snapshot::NumeraireSeries;
/// use margin_replay::valuation::{MarginReport, MarginReportRow, ValuationReports};
/// use scenario_core::types::{Date, SampleIndex};
///
/// let t0 = Date::from_ymd(2025, 1, 1).unwrap();
/// let asof = Date::from_ymd(2026, 1, 1).unwrap();
/// let report = MarginReport::from_rows(vec![MarginReportRow {
///     portfolio: "P".into(),
///     product_class: "All".into(),
///     risk_class: "All".into(),
///     margin_type: "All".into(),
///     bucket: "All".into(),
///     side: "Call".into(),
///     initial_margin: 1000.0,
///     currency: "EUR".into(),
/// }]);
/// let numeraire: NumeraireSeries = [(asof, 2.0)].into_iter().collect();
///
/// let aggregator = CubeAggregator::new("P", t0, &[MarginDepth::All]);
/// let out = aggregator
///     .rows(SampleIndex::new(1), asof, &ValuationReports::margin(report), &numeraire)
///     .unwrap();
/// assert_eq!(out.rows[0].margin, 500.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CubeAggregator<'a> {
    portfolio: &'a str,
    t0: Date,
    depths: &'a [MarginDepth],
}

impl<'a> CubeAggregator<'a> {
    /// Creates an aggregator recording `depths` of `portfolio`.
    pub fn new(portfolio: &'a str, t0: Date, depths: &'a [MarginDepth]) -> Self {
        Self {
            portfolio,
            t0,
            depths,
        }
    }

    /// Cube rows of one `(sample, asof)`.
    ///
    /// Margin rows come from the margin report, one per selected depth found
    /// there. The NPV row is added when the NPV report holds at least one
    /// trade of the portfolio's netting set. Without a margin report no
    /// margin row is produced, never a zero row.
    ///
    /// # Errors
    ///
    /// `CubeError::MissingNumeraire` / `CubeError::ZeroNumeraire` when there
    /// is something to normalise but no usable numeraire.
    pub fn rows(
        &self,
        sample: SampleIndex,
        asof: Date,
        reports: &ValuationReports,
        numeraire: &NumeraireSeries,
    ) -> Result<DateRows, CubeError> {
        let time = time_from_t0(self.t0, asof);
        let numeraire_at = || -> Result<f64, CubeError> {
            match numeraire.get(asof) {
                None => Err(CubeError::MissingNumeraire { sample, asof }),
                Some(n) if n == 0.0 => Err(CubeError::ZeroNumeraire { sample, asof }),
                Some(n) => Ok(n),
            }
        };
        let mut out = DateRows::default();

        match &reports.margin {
            None => out.skipped.push(SkipReason::MissingReport),
            Some(report) => {
                for &depth in self.depths {
                    let Some(row) = report.select(self.portfolio, depth.label()) else {
                        out.skipped.push(SkipReason::NoMatchingRow(depth));
                        continue;
                    };
                    out.rows.push(CubeRow {
                        portfolio: self.portfolio.to_string(),
                        sample,
                        asof,
                        time,
                        margin: row.initial_margin / numeraire_at()?,
                        currency: row.currency.clone(),
                        side: row.side.clone(),
                        depth,
                        margin_type: depth.label().to_string(),
                    });
                }
            }
        }

        if let Some(total) = reports
            .npv
            .as_ref()
            .and_then(|npv| npv.netting_set_total(self.portfolio))
        {
            out.rows.push(CubeRow {
                portfolio: self.portfolio.to_string(),
                sample,
                asof,
                time,
                margin: total.total / numeraire_at()?,
                currency: total.currency,
                side: CALL.to_string(),
                depth: MarginDepth::Npv,
                margin_type: MarginDepth::Npv.label().to_string(),
            });
        }

        Ok(out)
    }
}
