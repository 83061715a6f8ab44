//! Per-sample scenario replay.
//!
//! A [`SampleReplay`] drives one sample through the valuation service:
//!
//! ```text
//! Init ─▶ UpdateDescriptor(0) ─▶ Invoke(0) ─▶ Collect(0) ─▶ UpdateDescriptor(1) ─▶ … ─▶ Done
//! ```
//!
//! `Init` renders the market data file (every date, ascending) and the
//! fixing file once; each later triple handles one as-of date. Rows are
//! buffered and handed out only when the sample reaches `Done`, so a sample
//! that fails half-way leaves nothing behind in the cube.
//!
//! [`BenchmarkRun`] replays a batch of samples, sequentially or on a rayon
//! pool with one [`SampleWorkspace`] per sample.

mod run;
mod workspace;

pub use run::{BenchmarkInputs, BenchmarkRun, RunSummary, SampleFailure};
pub use workspace::SampleWorkspace;

use std::fmt;
use std::time::Instant;

use scenario_core::types::{Date, DateIndex, SampleIndex};
use scenario_core::{AggregationData, RiskFactorSchema, ScenarioStore};
use tracing::{debug, info};

use crate::cube::{CubeAggregator, CubeRow, MarginDepth, SkipReason};
use crate::error::{ReplayError, ReplayErrorKind};
use crate::snapshot::{
    FixingFile, FixingSnapshotBuilder, MarketDataFile, MarketSnapshotBuilder, NumeraireSeries,
};
use crate::valuation::ValuationService;

/// Read-only inputs shared by every sample of a run.
#[derive(Debug, Clone, Copy)]
pub struct ReplayInputs<'a> {
    /// Risk factor schema
    pub schema: &'a RiskFactorSchema,
    /// Scenario dump
    pub store: &'a ScenarioStore,
    /// Aggregation scenario data
    pub aggregation: &'a AggregationData,
    /// Global as-of date
    pub t0: Date,
    /// Portfolio whose margin is recorded
    pub portfolio: &'a str,
    /// Margin depths to record
    pub depths: &'a [MarginDepth],
}

/// Replay progress. Indices point into the sample's as-of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// Scratch files not yet written
    Init,
    /// Descriptor to be pointed at date `i`
    UpdateDescriptor(usize),
    /// Valuation of date `i` to be run
    Invoke(usize),
    /// Reports of date `i` to be read
    Collect(usize),
    /// Every date handled
    Done,
}

impl fmt::Display for ReplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayState::Init => write!(f, "Init"),
            ReplayState::UpdateDescriptor(i) => write!(f, "UpdateDescriptor({})", i),
            ReplayState::Invoke(i) => write!(f, "Invoke({})", i),
            ReplayState::Collect(i) => write!(f, "Collect({})", i),
            ReplayState::Done => write!(f, "Done"),
        }
    }
}

/// An as-of date that contributed fewer rows than selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSkip {
    /// As-of date
    pub asof: Date,
    /// What was missing
    pub reason: SkipReason,
}

/// Result of a completed sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    /// Sample
    pub sample: SampleIndex,
    /// Cube rows, in date order
    pub rows: Vec<CubeRow>,
    /// Dates with missing output
    pub skipped: Vec<DateSkip>,
}

/// State machine replaying one sample.
pub struct SampleReplay<'a, S> {
    inputs: ReplayInputs<'a>,
    sample: SampleIndex,
    workspace: &'a SampleWorkspace,
    service: S,
    state: ReplayState,
    dates: Vec<(DateIndex, Date)>,
    numeraire: NumeraireSeries,
    rows: Vec<CubeRow>,
    skipped: Vec<DateSkip>,
}

impl<'a, S: ValuationService> SampleReplay<'a, S> {
    /// Prepares a replay of `sample` writing into `workspace`.
    pub fn new(
        inputs: ReplayInputs<'a>,
        sample: SampleIndex,
        workspace: &'a SampleWorkspace,
        service: S,
    ) -> Self {
        Self {
            inputs,
            sample,
            workspace,
            service,
            state: ReplayState::Init,
            dates: Vec::new(),
            numeraire: NumeraireSeries::default(),
            rows: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Sample being replayed.
    pub fn sample(&self) -> SampleIndex {
        self.sample
    }

    /// As-of dates of this sample, known once `Init` has run.
    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.dates.iter().map(|(_, asof)| *asof)
    }

    /// Performs one transition and returns the new state.
    ///
    /// On error the state is left unchanged; the sample is not meant to be
    /// resumed.
    pub fn step(&mut self) -> Result<ReplayState, ReplayError> {
        let next = match self.state {
            ReplayState::Init => {
                self.render_inputs()?;
                self.first_date()
            }
            ReplayState::UpdateDescriptor(i) => {
                let asof = self.asof(i);
                self.service
                    .prepare(asof)
                    .map_err(|e| self.error(Some(asof), e))?;
                ReplayState::Invoke(i)
            }
            ReplayState::Invoke(i) => {
                let asof = self.asof(i);
                let started = Instant::now();
                self.service
                    .invoke(asof)
                    .map_err(|e| self.error(Some(asof), e))?;
                debug!(
                    sample = %self.sample,
                    asof = %asof,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Valuation invoked"
                );
                ReplayState::Collect(i)
            }
            ReplayState::Collect(i) => {
                self.collect(i)?;
                if i + 1 < self.dates.len() {
                    ReplayState::UpdateDescriptor(i + 1)
                } else {
                    ReplayState::Done
                }
            }
            ReplayState::Done => ReplayState::Done,
        };
        self.state = next;
        Ok(next)
    }

    /// Steps until `Done` and hands out the buffered rows.
    pub fn run(mut self) -> Result<SampleOutcome, ReplayError> {
        let started = Instant::now();
        while self.step()? != ReplayState::Done {}
        info!(
            sample = %self.sample,
            dates = self.dates.len(),
            rows = self.rows.len(),
            skipped = self.skipped.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sample replayed"
        );
        Ok(SampleOutcome {
            sample: self.sample,
            rows: self.rows,
            skipped: self.skipped,
        })
    }

    fn first_date(&self) -> ReplayState {
        if self.dates.is_empty() {
            ReplayState::Done
        } else {
            ReplayState::UpdateDescriptor(0)
        }
    }

    fn asof(&self, i: usize) -> Date {
        self.dates[i].1
    }

    fn error(&self, asof: Option<Date>, kind: impl Into<ReplayErrorKind>) -> ReplayError {
        ReplayError::new(self.sample, asof, kind)
    }

    /// Writes the market data file and the fixing file of the sample.
    fn render_inputs(&mut self) -> Result<(), ReplayError> {
        let inputs = self.inputs;
        let sample = self.sample;
        let market = MarketSnapshotBuilder::new(inputs.schema, inputs.store, inputs.t0);
        let market_file = MarketDataFile::new(self.workspace.market_file());

        market_file.clear().map_err(|e| self.error(None, e))?;
        let mut dates = Vec::new();
        for date in inputs.store.distinct_dates() {
            let asof = market
                .asof(sample, date)
                .map_err(|e| self.error(None, e))?;
            let snapshot = market
                .build(sample, date)
                .map_err(|e| self.error(Some(asof), e))?;
            market_file
                .append(&snapshot)
                .map_err(|e| self.error(Some(asof), e))?;
            debug!(
                sample = %sample,
                date_index = %date,
                asof = %asof,
                quotes = snapshot.quotes.len(),
                "Market snapshot appended"
            );
            dates.push((date, asof));
        }

        let (fixings, numeraire) =
            FixingSnapshotBuilder::new(inputs.aggregation, inputs.schema.grid(), inputs.t0)
                .build(sample)
                .map_err(|e| self.error(None, e))?;
        FixingFile::new(self.workspace.fixing_file())
            .write(&fixings)
            .map_err(|e| self.error(None, e))?;

        debug!(
            sample = %sample,
            dates = dates.len(),
            fixings = fixings.fixings.len(),
            market_file = %self.workspace.market_file().display(),
            "Replay inputs written"
        );
        self.dates = dates;
        self.numeraire = numeraire;
        Ok(())
    }

    fn collect(&mut self, i: usize) -> Result<(), ReplayError> {
        let asof = self.asof(i);
        let reports = self
            .service
            .collect(asof)
            .map_err(|e| self.error(Some(asof), e))?;
        let out = CubeAggregator::new(self.inputs.portfolio, self.inputs.t0, self.inputs.depths)
            .rows(self.sample, asof, &reports, &self.numeraire)
            .map_err(|e| self.error(Some(asof), e))?;

        for reason in out.skipped {
            debug!(sample = %self.sample, asof = %asof, reason = ?reason, "Date skipped");
            self.skipped.push(DateSkip { asof, reason });
        }
        self.rows.extend(out.rows);
        Ok(())
    }
}
