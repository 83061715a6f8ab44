//! Replay command implementation
//!
//! Replays the selected scenario samples through the configured margin
//! engine and writes the benchmark cube.

use std::path::{Path, PathBuf};

use margin_replay::config::{BenchmarkConfig, ConfigOverrides, SampleSelection};
use margin_replay::replay::{BenchmarkInputs, BenchmarkRun};
use margin_replay::valuation::ProcessValuationService;
use tracing::{info, warn};

use crate::{CliError, Result};

/// Flags of the replay command.
#[derive(Debug, Default)]
pub struct ReplayArgs {
    /// `--portfolio`
    pub portfolio: Option<String>,
    /// `--asof`
    pub asof: Option<String>,
    /// `--samples`
    pub samples: Option<SampleSelection>,
    /// `--workers`
    pub workers: Option<usize>,
    /// `--cube`
    pub cube: Option<PathBuf>,
    /// `--log-level`
    pub log_level: Option<String>,
    /// `--strict`
    pub strict: bool,
}

impl ReplayArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            portfolio: self.portfolio.clone(),
            asof: self.asof.clone(),
            samples: self.samples.clone(),
            workers: self.workers,
            cube: self.cube.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

/// Run the replay command
pub fn run(config_path: &Path, args: ReplayArgs) -> Result<()> {
    if !config_path.exists() {
        return Err(CliError::FileNotFound(config_path.display().to_string()));
    }
    let config = BenchmarkConfig::build(config_path, &args.overrides())?;

    info!("Starting replay...");
    info!("  Portfolio: {}", config.portfolio);
    info!("  Scenario dump: {}", config.scenario_dump.display());
    info!("  Job descriptor: {}", config.job_descriptor.display());
    info!("  Valuation program: {}", config.valuation.program);
    info!("  Workers: {}", config.workers);

    let inputs = BenchmarkInputs::load(&config)?;
    let run = BenchmarkRun::from_config(&config, &inputs)?;
    let summary = run.run(|ws| ProcessValuationService::for_workspace(&config.valuation, ws))?;

    for failure in &summary.failed {
        warn!("  Sample {} failed: {}", failure.sample, failure.message);
    }
    info!(
        "Replay complete: {}/{} samples, {} rows, {} skipped, {:.1}s",
        summary.completed.len(),
        run.samples().len(),
        summary.rows_written,
        summary.skipped,
        summary.elapsed.as_secs_f64()
    );
    info!("Cube written to {}", run.cube().path().display());

    if args.strict && !summary.is_complete() {
        return Err(CliError::Incomplete {
            failed: summary.failed.len(),
            requested: run.samples().len(),
        });
    }
    Ok(())
}
