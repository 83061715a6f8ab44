//! Batch replay of many samples into one cube.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use scenario_core::types::{Date, SampleIndex};
use scenario_core::{AggregationData, RiskFactorSchema, ScenarioStore};
use tracing::{debug, info, warn};

use super::{ReplayInputs, SampleOutcome, SampleReplay, SampleWorkspace};
use crate::config::BenchmarkConfig;
use crate::cube::{CubeWriter, MarginDepth};
use crate::error::{ReplayError, RunError};
use crate::valuation::{
    JobDescriptor, ValuationError, ValuationService, FIXING_DATA_PARAMETER, MARKET_DATA_PARAMETER,
    OUTPUT_PATH_PARAMETER,
};

/// Scenario data and descriptor loaded once per run.
#[derive(Debug)]
pub struct BenchmarkInputs {
    /// Risk factor schema
    pub schema: RiskFactorSchema,
    /// Scenario dump
    pub store: ScenarioStore,
    /// Aggregation scenario data
    pub aggregation: AggregationData,
    /// Job descriptor template
    pub descriptor: JobDescriptor,
    /// Global as-of date
    pub t0: Date,
    /// Report directory of the shared descriptor
    pub report_dir: PathBuf,
}

impl BenchmarkInputs {
    /// Loads every input named by `config`.
    ///
    /// t0 is the configured `asof`, else the descriptor's as-of date. The
    /// report directory is the configured one, else the descriptor's
    /// `outputPath`.
    pub fn load(config: &BenchmarkConfig) -> Result<Self, RunError> {
        let started = Instant::now();
        let schema = RiskFactorSchema::from_file(&config.simulation_config)?;
        let store = ScenarioStore::from_path(&config.scenario_dump)?;
        let aggregation = AggregationData::from_path(&config.aggregation_data)?;
        let descriptor = JobDescriptor::load(&config.job_descriptor)?;

        let t0 = match config.t0()? {
            Some(t0) => t0,
            None => descriptor.asof()?,
        };
        let report_dir = match &config.report_dir {
            Some(dir) => dir.clone(),
            None => descriptor
                .parameter(OUTPUT_PATH_PARAMETER)?
                .map(PathBuf::from)
                .ok_or_else(|| ValuationError::MissingParameter {
                    path: descriptor.path().display().to_string(),
                    name: OUTPUT_PATH_PARAMETER.to_string(),
                })?,
        };

        if config.workers <= 1 {
            check_scratch_path(&descriptor, MARKET_DATA_PARAMETER, &config.market_data_file)?;
            check_scratch_path(&descriptor, FIXING_DATA_PARAMETER, &config.fixing_data_file)?;
        }

        info!(
            t0 = %t0,
            factors = schema.factors().len(),
            grid_dates = schema.grid().len(),
            dump_records = store.len(),
            samples = store.samples().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded benchmark inputs"
        );

        Ok(Self {
            schema,
            store,
            aggregation,
            descriptor,
            t0,
            report_dir,
        })
    }
}

/// The shared descriptor is only ever edited at its as-of date, so it must
/// already read the scratch files the replay writes.
fn check_scratch_path(
    descriptor: &JobDescriptor,
    name: &str,
    configured: &Path,
) -> Result<(), ValuationError> {
    match descriptor.parameter(name)? {
        Some(value) if Path::new(value.trim()) != configured => {
            Err(ValuationError::ScratchPathMismatch {
                path: descriptor.path().display().to_string(),
                name: name.to_string(),
                descriptor: value,
                configured: configured.display().to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// A sample that did not make it into the cube.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFailure {
    /// Sample
    pub sample: SampleIndex,
    /// As-of date in flight
    pub asof: Option<Date>,
    /// Rendered error
    pub message: String,
}

impl From<&ReplayError> for SampleFailure {
    fn from(err: &ReplayError) -> Self {
        Self {
            sample: err.sample,
            asof: err.asof,
            message: err.to_string(),
        }
    }
}

/// What a batch run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Samples replayed to completion
    pub completed: Vec<SampleIndex>,
    /// Samples aborted
    pub failed: Vec<SampleFailure>,
    /// Rows appended to the cube
    pub rows_written: usize,
    /// `(sample, date, depth)` combinations without output
    pub skipped: usize,
    /// Wall-clock time
    pub elapsed: Duration,
}

impl RunSummary {
    /// Whether every requested sample completed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, outcome: &SampleOutcome) {
        self.completed.push(outcome.sample);
        self.rows_written += outcome.rows.len();
        self.skipped += outcome.skipped.len();
    }
}

/// Replays a list of samples into one cube.
///
/// With one worker every sample reuses the shared descriptor and scratch
/// files in turn; the descriptor is restored once the samples are done. With
/// more, samples run on a rayon pool, each in its own
/// [`SampleWorkspace::isolated`] directory; finished samples are appended
/// by the calling thread in sample order.
#[derive(Debug)]
pub struct BenchmarkRun<'a> {
    inputs: &'a BenchmarkInputs,
    portfolio: String,
    depths: Vec<MarginDepth>,
    samples: Vec<SampleIndex>,
    workers: usize,
    workspace_dir: PathBuf,
    shared: SampleWorkspace,
    cube: CubeWriter,
}

impl<'a> BenchmarkRun<'a> {
    /// Run over `inputs` as configured by `config`.
    ///
    /// Without a sample selection every sample of the dump is replayed.
    pub fn from_config(config: &BenchmarkConfig, inputs: &'a BenchmarkInputs) -> Result<Self, RunError> {
        let samples = match &config.samples {
            Some(selection) => selection.resolve(),
            None => inputs.store.samples().collect(),
        };
        Ok(Self {
            inputs,
            portfolio: config.portfolio.clone(),
            depths: config.margin_depths()?,
            samples,
            workers: config.workers.max(1),
            workspace_dir: config.workspace_dir.clone(),
            shared: SampleWorkspace::shared(
                inputs.descriptor.path(),
                &config.market_data_file,
                &config.fixing_data_file,
                &inputs.report_dir,
            ),
            cube: CubeWriter::new(&config.cube),
        })
    }

    /// Samples to replay, ascending.
    pub fn samples(&self) -> &[SampleIndex] {
        &self.samples
    }

    /// Cube writer.
    pub fn cube(&self) -> &CubeWriter {
        &self.cube
    }

    /// Number of parallel workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    fn replay_inputs(&self) -> ReplayInputs<'_> {
        ReplayInputs {
            schema: &self.inputs.schema,
            store: &self.inputs.store,
            aggregation: &self.inputs.aggregation,
            t0: self.inputs.t0,
            portfolio: &self.portfolio,
            depths: &self.depths,
        }
    }

    /// Resets the cube and replays every sample.
    ///
    /// `factory` builds the valuation service of one sample from its
    /// workspace. A failing sample is logged and listed in the summary; the
    /// run goes on. Only cube IO and pool creation abort the run.
    pub fn run<S, F>(&self, factory: F) -> Result<RunSummary, RunError>
    where
        S: ValuationService,
        F: Fn(&SampleWorkspace) -> Result<S, ValuationError> + Sync,
    {
        let started = Instant::now();
        self.cube.reset()?;
        info!(
            samples = self.samples.len(),
            workers = self.workers,
            portfolio = %self.portfolio,
            cube = %self.cube.path().display(),
            "Starting benchmark run"
        );

        let mut summary = if self.workers == 1 {
            self.run_sequential(&factory)?
        } else {
            self.run_parallel(&factory)?
        };
        summary.elapsed = started.elapsed();

        info!(
            completed = summary.completed.len(),
            failed = summary.failed.len(),
            rows = summary.rows_written,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Benchmark run finished"
        );
        Ok(summary)
    }

    fn run_sequential<S, F>(&self, factory: &F) -> Result<RunSummary, RunError>
    where
        S: ValuationService,
        F: Fn(&SampleWorkspace) -> Result<S, ValuationError>,
    {
        let mut summary = RunSummary::default();
        let replayed = self.samples.iter().try_for_each(|&sample| {
            let result = self.replay_sample(sample, &self.shared, factory);
            self.commit(&mut summary, result)
        });
        let restored = self.restore_descriptor();
        replayed?;
        restored?;
        Ok(summary)
    }

    /// Puts the shared descriptor back to the state it was loaded in, so the
    /// as-of date it carries stays t0 for the next run.
    fn restore_descriptor(&self) -> Result<(), ValuationError> {
        self.inputs.descriptor.save()?;
        debug!(
            descriptor = %self.inputs.descriptor.path().display(),
            "Restored shared job descriptor"
        );
        Ok(())
    }

    fn run_parallel<S, F>(&self, factory: &F) -> Result<RunSummary, RunError>
    where
        S: ValuationService,
        F: Fn(&SampleWorkspace) -> Result<S, ValuationError> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("replay-worker-{}", i))
            .build()
            .map_err(|e| RunError::Pool(e.to_string()))?;

        let results: Vec<Result<SampleOutcome, ReplayError>> = pool.install(|| {
            self.samples
                .par_iter()
                .map(|&sample| {
                    let workspace = SampleWorkspace::isolated(&self.workspace_dir, sample);
                    self.replay_sample(sample, &workspace, factory)
                })
                .collect()
        });

        let mut summary = RunSummary::default();
        for result in results {
            self.commit(&mut summary, result)?;
        }
        Ok(summary)
    }

    fn replay_sample<S, F>(
        &self,
        sample: SampleIndex,
        workspace: &SampleWorkspace,
        factory: &F,
    ) -> Result<SampleOutcome, ReplayError>
    where
        S: ValuationService,
        F: Fn(&SampleWorkspace) -> Result<S, ValuationError>,
    {
        workspace
            .create(&self.inputs.descriptor)
            .map_err(|e| ReplayError::new(sample, None, e))?;
        let service = factory(workspace).map_err(|e| ReplayError::new(sample, None, e))?;
        SampleReplay::new(self.replay_inputs(), sample, workspace, service).run()
    }

    fn commit(
        &self,
        summary: &mut RunSummary,
        result: Result<SampleOutcome, ReplayError>,
    ) -> Result<(), RunError> {
        match result {
            Ok(outcome) => {
                self.cube.append_all(&outcome.rows)?;
                summary.record(&outcome);
            }
            Err(err) => {
                warn!(
                    sample = %err.sample,
                    asof = ?err.asof,
                    error = %err,
                    "Sample replay failed"
                );
                summary.failed.push(SampleFailure::from(&err));
            }
        }
        Ok(())
    }
}
