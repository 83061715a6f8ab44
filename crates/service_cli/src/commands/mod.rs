//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod check;
pub mod evolution;
pub mod expected;
pub mod replay;

use std::path::{Path, PathBuf};

use margin_replay::config::BenchmarkConfig;
use tracing::debug;

/// Cube path from the flag, else the configuration, else the default.
pub(crate) fn cube_path(config: &Path, flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    match BenchmarkConfig::load(config) {
        Ok(loaded) => loaded.with_env_override().cube,
        Err(e) => {
            debug!(config = %config.display(), error = %e, "Using default cube path");
            BenchmarkConfig::default().with_env_override().cube
        }
    }
}
