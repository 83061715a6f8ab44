//! Benchmark run configuration.
//!
//! Loaded from a TOML file, then overridden by `BENCH_*` environment
//! variables, then by command-line flags:
//!
//! ```toml
//! portfolio = "CPTY_A"
//! asof = "2025-01-01"                # optional, else read from the job descriptor
//! simulation_config = "Input/simulation.xml"
//! scenario_dump = "Output/scenariodump.csv.gz"
//! aggregation_data = "Output/scenariodata.csv.gz"
//! job_descriptor = "Input/ore_simm.xml"
//! cube = "Output/benchmark_cube.csv"
//! samples = 10                        # or [1, 5, 7]; all dump samples if absent
//! workers = 4
//! depths = ["all", "delta", "vega", "curvature"]
//!
//! [valuation]
//! program = "ore"
//! timeout_secs = 900
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use scenario_core::types::{Date, SampleIndex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cube::MarginDepth;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const MAX_WORKERS: usize = 1024;

/// Which samples to replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleSelection {
    /// Samples `1..=n`
    Count(u32),
    /// Explicit 1-based sample numbers
    List(Vec<u32>),
}

impl SampleSelection {
    /// Resolves to an ascending, duplicate-free sample list.
    pub fn resolve(&self) -> Vec<SampleIndex> {
        let mut samples: Vec<SampleIndex> = match self {
            SampleSelection::Count(n) => (1..=*n).map(SampleIndex::new).collect(),
            SampleSelection::List(list) => list.iter().copied().map(SampleIndex::new).collect(),
        };
        samples.sort();
        samples.dedup();
        samples
    }
}

impl FromStr for SampleSelection {
    type Err = ConfigError;

    /// `"10"` selects samples 1 to 10; `"1,4,9"` selects exactly those.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::Parse(format!("Invalid sample selection '{}'", s)))
        };
        if s.contains(',') {
            s.split(',')
                .filter(|p| !p.trim().is_empty())
                .map(parse)
                .collect::<Result<Vec<_>, _>>()
                .map(SampleSelection::List)
        } else {
            parse(s).map(SampleSelection::Count)
        }
    }
}

/// External valuation program settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// Executable, invoked as `<program> <args..> <job descriptor>`
    #[serde(default = "default_program")]
    pub program: String,

    /// Extra arguments placed before the descriptor path
    #[serde(default)]
    pub args: Vec<String>,

    /// Per-invocation timeout; none waits indefinitely
    pub timeout_secs: Option<u64>,

    /// Margin report file name inside the report directory
    #[serde(default = "default_margin_report")]
    pub margin_report: String,

    /// NPV report file name inside the report directory
    #[serde(default = "default_npv_report")]
    pub npv_report: String,
}

fn default_program() -> String {
    "ore".to_string()
}

fn default_margin_report() -> String {
    "simm.csv".to_string()
}

fn default_npv_report() -> String {
    "npv.csv".to_string()
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            timeout_secs: None,
            margin_report: default_margin_report(),
            npv_report: default_npv_report(),
        }
    }
}

/// Benchmark run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Portfolio (netting set) whose margin is benchmarked
    #[serde(default = "default_portfolio")]
    pub portfolio: String,

    /// Global as-of date t0 (`YYYY-MM-DD`)
    pub asof: Option<String>,

    /// Simulation configuration document
    #[serde(default = "default_simulation_config")]
    pub simulation_config: PathBuf,

    /// Scenario dump (plain or gzip)
    #[serde(default = "default_scenario_dump")]
    pub scenario_dump: PathBuf,

    /// Aggregation scenario data (plain or gzip)
    #[serde(default = "default_aggregation_data")]
    pub aggregation_data: PathBuf,

    /// Margin job descriptor
    #[serde(default = "default_job_descriptor")]
    pub job_descriptor: PathBuf,

    /// Market data file the descriptor points at
    #[serde(default = "default_market_data_file")]
    pub market_data_file: PathBuf,

    /// Fixing file the descriptor points at
    #[serde(default = "default_fixing_data_file")]
    pub fixing_data_file: PathBuf,

    /// Report directory; the descriptor's `outputPath` if absent
    pub report_dir: Option<PathBuf>,

    /// Benchmark cube file
    #[serde(default = "default_cube")]
    pub cube: PathBuf,

    /// Parent of the per-worker `sample_<n>` directories
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    /// Samples to replay; every sample of the dump if absent
    pub samples: Option<SampleSelection>,

    /// Parallel sample workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Margin depths to record
    #[serde(default = "default_depths")]
    pub depths: Vec<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Valuation program
    #[serde(default)]
    pub valuation: ValuationConfig,
}

fn default_portfolio() -> String {
    "CPTY_A".to_string()
}

fn default_simulation_config() -> PathBuf {
    PathBuf::from("Input/simulation.xml")
}

fn default_scenario_dump() -> PathBuf {
    PathBuf::from("Output/scenariodump.csv")
}

fn default_aggregation_data() -> PathBuf {
    PathBuf::from("Output/scenariodata.csv")
}

fn default_job_descriptor() -> PathBuf {
    PathBuf::from("Input/ore_simm.xml")
}

fn default_market_data_file() -> PathBuf {
    PathBuf::from("Input/market_replay.txt")
}

fn default_fixing_data_file() -> PathBuf {
    PathBuf::from("Input/fixings_replay.txt")
}

fn default_cube() -> PathBuf {
    PathBuf::from("Output/benchmark_cube.csv")
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("Output/replay_workers")
}

fn default_workers() -> usize {
    1
}

fn default_depths() -> Vec<String> {
    vec!["all".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            portfolio: default_portfolio(),
            asof: None,
            simulation_config: default_simulation_config(),
            scenario_dump: default_scenario_dump(),
            aggregation_data: default_aggregation_data(),
            job_descriptor: default_job_descriptor(),
            market_data_file: default_market_data_file(),
            fixing_data_file: default_fixing_data_file(),
            report_dir: None,
            cube: default_cube(),
            workspace_dir: default_workspace_dir(),
            samples: None,
            workers: default_workers(),
            depths: default_depths(),
            log_level: default_log_level(),
            valuation: ValuationConfig::default(),
        }
    }
}

/// Command-line values that take precedence over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
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
}

impl BenchmarkConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `BENCH_*` environment variable overrides
    pub fn with_env_override(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(portfolio) = var("BENCH_PORTFOLIO") {
            self.portfolio = portfolio;
        }
        if let Some(asof) = var("BENCH_ASOF") {
            self.asof = Some(asof);
        }
        if let Some(path) = var("BENCH_SIMULATION_CONFIG") {
            self.simulation_config = PathBuf::from(path);
        }
        if let Some(path) = var("BENCH_SCENARIO_DUMP") {
            self.scenario_dump = PathBuf::from(path);
        }
        if let Some(path) = var("BENCH_AGGREGATION_DATA") {
            self.aggregation_data = PathBuf::from(path);
        }
        if let Some(path) = var("BENCH_JOB_DESCRIPTOR") {
            self.job_descriptor = PathBuf::from(path);
        }
        if let Some(path) = var("BENCH_CUBE") {
            self.cube = PathBuf::from(path);
        }
        if let Some(samples) = var("BENCH_SAMPLES") {
            if let Ok(selection) = samples.parse() {
                self.samples = Some(selection);
            }
        }
        if let Some(workers) = var("BENCH_WORKERS") {
            if let Ok(workers) = workers.parse() {
                self.workers = workers;
            }
        }
        if let Some(log_level) = var("BENCH_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Some(program) = var("BENCH_VALUATION_PROGRAM") {
            self.valuation.program = program;
        }
        if let Some(timeout) = var("BENCH_VALUATION_TIMEOUT") {
            self.valuation.timeout_secs = timeout.parse().ok();
        }
        self
    }

    /// Apply command-line overrides
    pub fn merge_with_cli(mut self, cli: &ConfigOverrides) -> Self {
        if let Some(portfolio) = &cli.portfolio {
            self.portfolio = portfolio.clone();
        }
        if let Some(asof) = &cli.asof {
            self.asof = Some(asof.clone());
        }
        if let Some(samples) = &cli.samples {
            self.samples = Some(samples.clone());
        }
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(cube) = &cli.cube {
            self.cube = cube.clone();
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = log_level.clone();
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "Invalid log_level '{}'. Valid values: {:?}",
                self.log_level, VALID_LOG_LEVELS
            ));
        }

        if self.portfolio.trim().is_empty() {
            errors.push("portfolio cannot be empty".to_string());
        }

        if let Some(asof) = &self.asof {
            if Date::parse(asof).is_err() {
                errors.push(format!("Invalid asof '{}'. Expected YYYY-MM-DD", asof));
            }
        }

        for (name, path) in [
            ("simulation_config", &self.simulation_config),
            ("scenario_dump", &self.scenario_dump),
            ("aggregation_data", &self.aggregation_data),
            ("job_descriptor", &self.job_descriptor),
            ("market_data_file", &self.market_data_file),
            ("fixing_data_file", &self.fixing_data_file),
            ("cube", &self.cube),
        ] {
            if path.as_os_str().is_empty() {
                errors.push(format!("{} cannot be empty", name));
            }
        }

        if self.workers == 0 {
            errors.push("workers must be greater than 0".to_string());
        }
        if self.workers > MAX_WORKERS {
            errors.push(format!(
                "workers {} exceeds maximum allowed ({})",
                self.workers, MAX_WORKERS
            ));
        }
        if self.workers > 1 && self.workspace_dir.as_os_str().is_empty() {
            errors.push("Parallel replay requires workspace_dir to be set".to_string());
        }

        match &self.samples {
            Some(SampleSelection::Count(0)) => {
                errors.push("samples count must be greater than 0".to_string())
            }
            Some(SampleSelection::List(list)) if list.is_empty() => {
                errors.push("samples list cannot be empty".to_string())
            }
            Some(SampleSelection::List(list)) if list.contains(&0) => errors.push(
                "samples are numbered from 1; sample 0 cannot be replayed".to_string(),
            ),
            _ => {}
        }

        if self.depths.is_empty() {
            errors.push("depths cannot be empty".to_string());
        }
        for depth in &self.depths {
            match depth.parse::<MarginDepth>() {
                Ok(MarginDepth::Npv) => errors.push(
                    "depth 'npv' is recorded automatically and cannot be selected".to_string(),
                ),
                Ok(_) => {}
                Err(_) => errors.push(format!(
                    "Invalid depth '{}'. Valid values: all, delta, vega, curvature",
                    depth
                )),
            }
        }

        if self.valuation.program.trim().is_empty() {
            errors.push("valuation.program cannot be empty".to_string());
        }
        if self.valuation.timeout_secs == Some(0) {
            errors.push("valuation.timeout_secs must be greater than 0".to_string());
        }
        if self.valuation.margin_report.trim().is_empty() {
            errors.push("valuation.margin_report cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load from file with environment and command-line overrides, then validate
    pub fn build(path: &Path, cli: &ConfigOverrides) -> Result<Self, ConfigError> {
        let config = Self::load(path)?.with_env_override().merge_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// The configured t0, if any.
    pub fn t0(&self) -> Result<Option<Date>, ConfigError> {
        self.asof
            .as_deref()
            .map(|s| Date::parse(s).map_err(|e| ConfigError::Parse(e.to_string())))
            .transpose()
    }

    /// Selected margin depths, in configuration order without repeats.
    pub fn margin_depths(&self) -> Result<Vec<MarginDepth>, ConfigError> {
        let mut depths = Vec::with_capacity(self.depths.len());
        for label in &self.depths {
            let depth: MarginDepth = label
                .parse()
                .map_err(|_| ConfigError::Parse(format!("Invalid depth '{}'", label)))?;
            if !depths.contains(&depth) {
                depths.push(depth);
            }
        }
        Ok(depths)
    }
}

/// Configuration error type
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error in config file
    #[error("Parse error: {0}")]
    Parse(String),
    /// Validation error
    #[error("Validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
