//! Evolution command implementation
//!
//! Prints the margin path of one sample from the cube.

use std::path::Path;

use margin_replay::cube::analytics::{evolution_for_sample, CsvCube, CubeSource};
use margin_replay::cube::MarginDepth;
use scenario_core::types::SampleIndex;
use tracing::info;

use super::cube_path;
use crate::output::{write_rows, Format};
use crate::{CliError, Result};

/// Run the evolution command
pub fn run(
    config_path: &Path,
    sample: u32,
    depth: &str,
    cube: Option<&Path>,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let format: Format = format.parse()?;
    let depth: MarginDepth = depth.parse().map_err(CliError::InvalidArgument)?;
    if sample == 0 {
        return Err(CliError::InvalidArgument(
            "samples are numbered from 1".to_string(),
        ));
    }

    let cube = cube_path(config_path, cube);
    if !cube.exists() {
        return Err(CliError::FileNotFound(cube.display().to_string()));
    }
    let rows = CsvCube::new(&cube).rows()?;
    let evolution = evolution_for_sample(&rows, SampleIndex::new(sample), depth);
    info!(
        "Sample {} depth {}: {} of {} cube rows",
        sample,
        depth,
        evolution.len(),
        rows.len()
    );

    write_rows(&evolution, format, output)
}
