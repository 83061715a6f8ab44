//! File locations used while replaying one sample.

use std::path::{Path, PathBuf};

use scenario_core::types::SampleIndex;

use crate::valuation::{
    JobDescriptor, ValuationError, FIXING_DATA_PARAMETER, MARKET_DATA_PARAMETER,
    OUTPUT_PATH_PARAMETER,
};

/// Descriptor, scratch files and report directory of one sample.
///
/// A shared workspace reuses the configured descriptor in place and suits
/// sequential runs only. An isolated workspace lives under
/// `<base>/sample_<n>/` with its own descriptor copy:
///
/// ```text
/// sample_<n>/
///   ore.xml        descriptor copy pointing at the files below
///   market.txt
///   fixings.txt
///   output/        report directory
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleWorkspace {
    descriptor: PathBuf,
    market_file: PathBuf,
    fixing_file: PathBuf,
    report_dir: PathBuf,
    root: Option<PathBuf>,
}

impl SampleWorkspace {
    /// Workspace over the configured files.
    pub fn shared(
        descriptor: impl Into<PathBuf>,
        market_file: impl Into<PathBuf>,
        fixing_file: impl Into<PathBuf>,
        report_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            descriptor: descriptor.into(),
            market_file: market_file.into(),
            fixing_file: fixing_file.into(),
            report_dir: report_dir.into(),
            root: None,
        }
    }

    /// Private workspace of `sample` under `base`.
    pub fn isolated(base: &Path, sample: SampleIndex) -> Self {
        let root = base.join(format!("sample_{}", sample));
        Self {
            descriptor: root.join("ore.xml"),
            market_file: root.join("market.txt"),
            fixing_file: root.join("fixings.txt"),
            report_dir: root.join("output"),
            root: Some(root),
        }
    }

    /// Creates the directories and, when isolated, the descriptor copy.
    ///
    /// The copy is `template` with its market data, fixing and output path
    /// parameters pointing into this workspace.
    pub fn create(&self, template: &JobDescriptor) -> Result<(), ValuationError> {
        std::fs::create_dir_all(&self.report_dir)
            .map_err(|e| ValuationError::io(&self.report_dir, e))?;
        for file in [&self.market_file, &self.fixing_file, &self.descriptor] {
            if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| ValuationError::io(parent, e))?;
            }
        }

        if self.root.is_none() {
            return Ok(());
        }

        let mut copy = template.clone();
        copy.set_parameter(MARKET_DATA_PARAMETER, &self.market_file.display().to_string())?;
        copy.set_parameter(FIXING_DATA_PARAMETER, &self.fixing_file.display().to_string())?;
        copy.set_parameter(OUTPUT_PATH_PARAMETER, &self.report_dir.display().to_string())?;
        copy.save_as(&self.descriptor)?;
        tracing::debug!(descriptor = %self.descriptor.display(), "Created worker descriptor");
        Ok(())
    }

    /// Job descriptor path.
    pub fn descriptor(&self) -> &Path {
        &self.descriptor
    }

    /// Market data file path.
    pub fn market_file(&self) -> &Path {
        &self.market_file
    }

    /// Fixing file path.
    pub fn fixing_file(&self) -> &Path {
        &self.fixing_file
    }

    /// Report directory.
    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Whether this workspace owns a private descriptor copy.
    pub fn is_isolated(&self) -> bool {
        self.root.is_some()
    }
}
