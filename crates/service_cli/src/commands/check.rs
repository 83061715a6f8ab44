//! Check command implementation
//!
//! Loads the configuration and every input a replay would read, and
//! reports problems without invoking the margin engine.

use std::path::{Path, PathBuf};

use margin_replay::config::{BenchmarkConfig, ConfigOverrides};
use margin_replay::replay::BenchmarkInputs;
use margin_replay::snapshot::MarketSnapshotBuilder;
use tracing::{info, warn};

use crate::{CliError, Result};

/// Run the check command
pub fn run(config_path: &Path) -> Result<()> {
    info!("Checking configuration {}", config_path.display());
    if !config_path.exists() {
        return Err(CliError::FileNotFound(config_path.display().to_string()));
    }
    let config = BenchmarkConfig::build(config_path, &ConfigOverrides::default())?;
    info!("  Configuration: OK");

    for path in [
        &config.simulation_config,
        &config.scenario_dump,
        &config.aggregation_data,
        &config.job_descriptor,
    ] {
        if !path.exists() {
            return Err(CliError::FileNotFound(path.display().to_string()));
        }
    }

    let inputs = BenchmarkInputs::load(&config)?;
    info!("  t0: {}", inputs.t0);
    info!(
        "  Schema: {} factors, base {}, {} grid dates",
        inputs.schema.factors().len(),
        inputs.schema.base_currency(),
        inputs.schema.grid().len()
    );
    info!(
        "  Scenario dump: {} records, {} samples, {} dates",
        inputs.store.len(),
        inputs.store.samples().count(),
        inputs.store.distinct_dates().count()
    );
    info!(
        "  Aggregation data: {} declarations, {} samples",
        inputs.aggregation.declarations().count(),
        inputs.aggregation.samples().count()
    );
    info!("  Report directory: {}", inputs.report_dir.display());

    let samples = match &config.samples {
        Some(selection) => selection.resolve(),
        None => inputs.store.samples().collect(),
    };
    let market = MarketSnapshotBuilder::new(&inputs.schema, &inputs.store, inputs.t0);
    let mut problems = 0usize;
    for &sample in &samples {
        for date in inputs.store.distinct_dates() {
            if let Err(e) = market.build(sample, date) {
                warn!("  {}", e);
                problems += 1;
                break;
            }
        }
        if let Err(e) = inputs.aggregation.values_for(sample) {
            warn!("  {}", e);
            problems += 1;
        }
    }

    match find_program(&config.valuation.program) {
        Some(path) => info!("  Valuation program: {}", path.display()),
        None => {
            warn!("  Valuation program '{}' not found", config.valuation.program);
            problems += 1;
        }
    }

    if problems == 0 {
        info!("All checks passed for {} samples", samples.len());
        Ok(())
    } else {
        Err(CliError::InvalidArgument(format!(
            "{} problems found, see log",
            problems
        )))
    }
}

/// Resolves `program` like a shell would: as a path when it has a
/// separator, else on `PATH`.
fn find_program(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|candidate| candidate.is_file())
    })
}
