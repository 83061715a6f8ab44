//! Valuation service seam.
//!
//! The margin engine is an external black box driven through a job
//! descriptor and read back through report files. [`ValuationService`]
//! keeps that file traffic behind three calls so the replay logic can be
//! exercised against an in-process stub:
//!
//! 1. `prepare(asof)`: point the job at the date, drop stale reports
//! 2. `invoke(asof)`: run the job synchronously
//! 3. `collect(asof)`: read whatever reports the job produced
//!
//! [`ProcessValuationService`] is the production implementation.

mod descriptor;
mod error;
mod process;
mod report;

pub use descriptor::{
    JobDescriptor, ASOF_PARAMETER, FIXING_DATA_PARAMETER, MARKET_DATA_PARAMETER,
    OUTPUT_PATH_PARAMETER,
};
pub use error::ValuationError;
pub use process::ProcessValuationService;
pub use report::{MarginReport, MarginReportRow, NettingSetNpv, NpvReport, NpvTrade, ALL, CALL};

use scenario_core::types::Date;

/// Reports produced by one invocation. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuationReports {
    /// Margin report, `None` when the job wrote none
    pub margin: Option<MarginReport>,
    /// NPV report, `None` when the job wrote none
    pub npv: Option<NpvReport>,
}

impl ValuationReports {
    /// No report at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Only a margin report.
    pub fn margin(report: MarginReport) -> Self {
        Self {
            margin: Some(report),
            npv: None,
        }
    }
}

/// Synchronous interface to the external margin engine.
///
/// Calls for one sample arrive in the order `prepare → invoke → collect`
/// per date, dates ascending. Implementations own any file state they
/// touch; two samples never share an instance.
pub trait ValuationService {
    /// Points the job at `asof` and removes reports of a previous date.
    fn prepare(&mut self, asof: Date) -> Result<(), ValuationError>;

    /// Runs the job to completion.
    fn invoke(&mut self, asof: Date) -> Result<(), ValuationError>;

    /// Reads the reports of the last invocation.
    fn collect(&mut self, asof: Date) -> Result<ValuationReports, ValuationError>;
}

impl<S: ValuationService + ?Sized> ValuationService for &mut S {
    fn prepare(&mut self, asof: Date) -> Result<(), ValuationError> {
        (**self).prepare(asof)
    }

    fn invoke(&mut self, asof: Date) -> Result<(), ValuationError> {
        (**self).invoke(asof)
    }

    fn collect(&mut self, asof: Date) -> Result<ValuationReports, ValuationError> {
        (**self).collect(asof)
    }
}
