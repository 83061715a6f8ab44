//! Expected command implementation
//!
//! Averages the cube across samples per portfolio, depth and date.

use std::path::Path;

use margin_replay::cube::analytics::{expected_evolution, CsvCube, CubeSource};
use tracing::info;

use super::cube_path;
use crate::output::{write_rows, Format};
use crate::{CliError, Result};

/// Run the expected command
pub fn run(config_path: &Path, cube: Option<&Path>, format: &str, output: Option<&Path>) -> Result<()> {
    let format: Format = format.parse()?;
    let cube = cube_path(config_path, cube);
    if !cube.exists() {
        return Err(CliError::FileNotFound(cube.display().to_string()));
    }

    let rows = CsvCube::new(&cube).rows()?;
    let expected = expected_evolution(&rows);
    info!("{} cube rows reduced to {} expected points", rows.len(), expected.len());

    write_rows(&expected, format, output)
}
