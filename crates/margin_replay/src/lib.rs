//! # margin_replay: Scenario Replay Engine
//!
//! ## Layer 2 (Engine) Role
//!
//! Replays a Monte-Carlo scenario dump path by path through an external
//! margin service and assembles the normalised results into a benchmark
//! cube.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              margin_replay (L2)              │
//! ├──────────────────────────────────────────────┤
//! │  snapshot/   - market + fixing files         │
//! │  valuation/  - service seam, job descriptor, │
//! │                report parsing                │
//! │  replay/     - per-sample state machine,     │
//! │                batch runner, workspaces      │
//! │  cube/       - aggregation, writer,          │
//! │                analytics                     │
//! │  config      - BenchmarkConfig (TOML + env)  │
//! └──────────────────────────────────────────────┘
//!          ↓
//! ┌──────────────────────────────────────────────┐
//! │              scenario_core (L1)              │
//! │  schema, scenario decoding, dates, indices   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use margin_replay::config::{BenchmarkConfig, ConfigOverrides};
//! use margin_replay::replay::{BenchmarkInputs, BenchmarkRun};
//! use margin_replay::valuation::ProcessValuationService;
//! use std::path::Path;
//!
//! let config = BenchmarkConfig::build(Path::new("bench.toml"), &ConfigOverrides::default())?;
//! let inputs = BenchmarkInputs::load(&config)?;
//! let run = BenchmarkRun::from_config(&config, &inputs)?;
//! let summary = run.run(|ws| ProcessValuationService::for_workspace(&config.valuation, ws))?;
//! println!("{} rows, {} failed samples", summary.rows_written, summary.failed.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod cube;
pub mod error;
pub mod replay;
pub mod snapshot;
pub mod valuation;

pub use config::{BenchmarkConfig, ConfigError, ConfigOverrides, SampleSelection};
pub use cube::{CubeAggregator, CubeRow, CubeWriter, MarginDepth};
pub use error::{ReplayError, ReplayErrorKind, RunError};
pub use replay::{BenchmarkInputs, BenchmarkRun, RunSummary, SampleReplay};
pub use valuation::{ProcessValuationService, ValuationService};
