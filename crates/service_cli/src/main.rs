//! margin-bench - Scenario Replay Margin Benchmark CLI
//!
//! Operational entry point for the replay engine.
//!
//! # Commands
//!
//! - `margin-bench replay` - Replay scenario samples through the margin engine into the cube
//! - `margin-bench evolution --sample <n>` - Margin evolution of one sample
//! - `margin-bench expected` - Expected margin profile across samples
//! - `margin-bench check` - Validate configuration and inputs without replaying
//!
//! # Architecture
//!
//! Service layer on top of `margin_replay` (engine) and `scenario_core`
//! (foundation). Configuration is read from `--config` (default
//! `bench.toml`), then `BENCH_*` environment variables, then flags.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use margin_replay::config::{BenchmarkConfig, SampleSelection};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod error;
mod output;

pub use error::{CliError, Result};

/// Scenario replay margin benchmark
#[derive(Parser)]
#[command(name = "margin-bench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "bench.toml", env = "BENCH_CONFIG")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay scenario samples through the margin engine
    Replay {
        /// Portfolio (netting set) to benchmark
        #[arg(short, long)]
        portfolio: Option<String>,

        /// Global as-of date (YYYY-MM-DD); read from the job descriptor if absent
        #[arg(long)]
        asof: Option<String>,

        /// Samples: a count ("10") or a list ("1,4,9")
        #[arg(short, long)]
        samples: Option<SampleSelection>,

        /// Parallel sample workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Cube output file
        #[arg(long)]
        cube: Option<PathBuf>,

        /// Fail when any sample could not be replayed
        #[arg(long)]
        strict: bool,
    },

    /// Print the margin evolution of one sample
    Evolution {
        /// 1-based sample
        #[arg(short, long)]
        sample: u32,

        /// Margin depth (all, delta, vega, curvature, npv or 0-4)
        #[arg(short, long, default_value = "all")]
        depth: String,

        /// Cube file; the configured cube if absent
        #[arg(long)]
        cube: Option<PathBuf>,

        /// Output format (csv, json, table)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the expected margin profile across samples
    Expected {
        /// Cube file; the configured cube if absent
        #[arg(long)]
        cube: Option<PathBuf>,

        /// Output format (csv, json, table)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration and inputs
    Check,
}

/// Log level from flags, else the configuration file, else `info`.
fn log_level(cli: &Cli) -> String {
    if let Some(level) = &cli.log_level {
        return level.clone();
    }
    if cli.verbose {
        return "debug".to_string();
    }
    BenchmarkConfig::load(&cli.config)
        .map(|config| config.with_env_override().log_level)
        .unwrap_or_else(|_| "info".to_string())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&log_level(&cli));
    debug!(config = %cli.config.display(), "Starting margin-bench");

    match cli.command {
        Commands::Replay {
            portfolio,
            asof,
            samples,
            workers,
            cube,
            strict,
        } => commands::replay::run(
            &cli.config,
            commands::replay::ReplayArgs {
                portfolio,
                asof,
                samples,
                workers,
                cube,
                log_level: cli.log_level,
                strict,
            },
        ),
        Commands::Evolution {
            sample,
            depth,
            cube,
            format,
            output,
        } => commands::evolution::run(
            &cli.config,
            sample,
            &depth,
            cube.as_deref(),
            &format,
            output.as_deref(),
        ),
        Commands::Expected {
            cube,
            format,
            output,
        } => commands::expected::run(&cli.config, cube.as_deref(), &format, output.as_deref()),
        Commands::Check => commands::check::run(&cli.config),
    }
}
