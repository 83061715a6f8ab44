//! Append-only cube persistence.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{CubeError, CubeRow};

/// Single writer of the cube file.
///
/// The header is written only when the file is new or empty; every later
/// call appends rows.
#[derive(Debug, Clone)]
pub struct CubeWriter {
    path: PathBuf,
}

impl CubeWriter {
    /// Binds to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cube file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes a stale cube before a fresh run.
    pub fn reset(&self) -> Result<(), CubeError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Removed stale cube");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io(source)),
        }
    }

    /// Appends one row.
    pub fn append(&self, row: &CubeRow) -> Result<(), CubeError> {
        self.append_all(std::slice::from_ref(row))
    }

    /// Appends rows in order; writes the header first if the file is empty.
    pub fn append_all(&self, rows: &[CubeRow]) -> Result<(), CubeError> {
        if rows.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io(e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io(e))?;
        let needs_header = file.metadata().map_err(|e| self.io(e))?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for row in rows {
            writer.serialize(row).map_err(|e| self.csv(e))?;
        }
        writer.flush().map_err(|e| self.io(e))
    }

    fn io(&self, source: std::io::Error) -> CubeError {
        CubeError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn csv(&self, error: csv::Error) -> CubeError {
        CubeError::Csv {
            path: self.path.display().to_string(),
            message: error.to_string(),
        }
    }
}
