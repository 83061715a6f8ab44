//! External-process valuation service.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use scenario_core::types::Date;
use tracing::{debug, warn};

use super::{JobDescriptor, MarginReport, NpvReport, ValuationError, ValuationReports, ValuationService};
use crate::config::ValuationConfig;
use crate::replay::SampleWorkspace;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const LOG_FILE: &str = "valuation.log";

/// Runs `<program> <args..> <descriptor>` once per date.
///
/// The descriptor is rewritten in place before each run; reports are read
/// from `report_dir`. Program output goes to `report_dir/valuation.log`.
#[derive(Debug)]
pub struct ProcessValuationService {
    config: ValuationConfig,
    descriptor: JobDescriptor,
    report_dir: PathBuf,
}

impl ProcessValuationService {
    /// Creates a service for an already loaded descriptor.
    pub fn new(config: ValuationConfig, descriptor: JobDescriptor, report_dir: PathBuf) -> Self {
        Self {
            config,
            descriptor,
            report_dir,
        }
    }

    /// Creates a service driving the descriptor of `workspace`.
    pub fn for_workspace(
        config: &ValuationConfig,
        workspace: &SampleWorkspace,
    ) -> Result<Self, ValuationError> {
        let descriptor = JobDescriptor::load(workspace.descriptor())?;
        Ok(Self::new(
            config.clone(),
            descriptor,
            workspace.report_dir().to_path_buf(),
        ))
    }

    fn margin_report_path(&self) -> PathBuf {
        self.report_dir.join(&self.config.margin_report)
    }

    fn npv_report_path(&self) -> PathBuf {
        self.report_dir.join(&self.config.npv_report)
    }

    fn spawn(&self) -> Result<Child, ValuationError> {
        let log_path = self.report_dir.join(LOG_FILE);
        let log = File::create(&log_path).map_err(|e| ValuationError::io(&log_path, e))?;
        let log_err = log.try_clone().map_err(|e| ValuationError::io(&log_path, e))?;

        Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(self.descriptor.path())
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|source| ValuationError::Spawn {
                program: self.config.program.clone(),
                source,
            })
    }

    fn wait(&self, mut child: Child) -> Result<ExitStatus, ValuationError> {
        let program = || self.config.program.clone();
        let Some(timeout_secs) = self.config.timeout_secs else {
            return child.wait().map_err(|source| ValuationError::Spawn {
                program: program(),
                source,
            });
        };

        let timeout = Duration::from_secs(timeout_secs);
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if started.elapsed() >= timeout => {
                    if let Err(e) = child.kill() {
                        warn!(program = %self.config.program, error = %e, "Failed to kill timed-out valuation");
                    }
                    let _ = child.wait();
                    return Err(ValuationError::Timeout {
                        program: program(),
                        timeout_secs,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    return Err(ValuationError::Spawn {
                        program: program(),
                        source,
                    })
                }
            }
        }
    }
}

fn remove_stale(path: &Path) -> Result<(), ValuationError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ValuationError::io(path, e)),
    }
}

impl ValuationService for ProcessValuationService {
    fn prepare(&mut self, asof: Date) -> Result<(), ValuationError> {
        self.descriptor.set_asof(asof)?;
        self.descriptor.save()?;
        std::fs::create_dir_all(&self.report_dir)
            .map_err(|e| ValuationError::io(&self.report_dir, e))?;
        remove_stale(&self.margin_report_path())?;
        remove_stale(&self.npv_report_path())
    }

    fn invoke(&mut self, asof: Date) -> Result<(), ValuationError> {
        let started = Instant::now();
        let child = self.spawn()?;
        let status = self.wait(child)?;
        debug!(
            asof = %asof,
            program = %self.config.program,
            elapsed_ms = started.elapsed().as_millis() as u64,
            status = %status,
            "Valuation finished"
        );
        if status.success() {
            Ok(())
        } else {
            Err(ValuationError::ExitStatus {
                program: self.config.program.clone(),
                status: status.to_string(),
            })
        }
    }

    fn collect(&mut self, _asof: Date) -> Result<ValuationReports, ValuationError> {
        let margin_path = self.margin_report_path();
        let npv_path = self.npv_report_path();
        Ok(ValuationReports {
            margin: margin_path
                .exists()
                .then(|| MarginReport::from_path(&margin_path))
                .transpose()?,
            npv: npv_path
                .exists()
                .then(|| NpvReport::from_path(&npv_path))
                .transpose()?,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    const DESCRIPTOR: &str =
        r#"<ORE><Setup><Parameter name="asofDate">2025-01-01</Parameter></Setup></ORE>"#;

    fn script(dir: &Path, body: &str) -> String {
        let path = dir.join("valuation.sh");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn service(dir: &Path, body: &str, timeout_secs: Option<u64>) -> ProcessValuationService {
        let descriptor_path = dir.join("ore.xml");
        fs::write(&descriptor_path, DESCRIPTOR).unwrap();
        let config = ValuationConfig {
            program: script(dir, body),
            timeout_secs,
            ..Default::default()
        };
        ProcessValuationService::new(
            config,
            JobDescriptor::load(&descriptor_path).unwrap(),
            dir.join("out"),
        )
    }

    #[test]
    fn test_prepare_rewrites_descriptor_and_clears_reports() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(dir.path(), "exit 0", None);
        fs::create_dir_all(dir.path().join("out")).unwrap();
        fs::write(dir.path().join("out/simm.csv"), "stale").unwrap();

        svc.prepare(Date::from_ymd(2025, 7, 1).unwrap()).unwrap();

        let xml = fs::read_to_string(dir.path().join("ore.xml")).unwrap();
        assert!(xml.contains("2025-07-01"));
        assert!(!dir.path().join("out/simm.csv").exists());
    }

    #[test]
    fn test_invoke_and_collect() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let body = format!(
            "printf '#Portfolio,ProductClass,RiskClass,MarginType,Bucket,SimmSide,InitialMargin,Currency\\nP,All,All,All,All,Call,10,EUR\\n' > {}/simm.csv",
            out.display()
        );
        let mut svc = service(dir.path(), &body, Some(30));
        let asof = Date::from_ymd(2025, 7, 1).unwrap();
        svc.prepare(asof).unwrap();
        svc.invoke(asof).unwrap();
        let reports = svc.collect(asof).unwrap();
        assert!(reports.npv.is_none());
        let margin = reports.margin.unwrap();
        assert_eq!(margin.select("P", "All").unwrap().initial_margin, 10.0);
    }

    #[test]
    fn test_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(dir.path(), "exit 3", None);
        let asof = Date::from_ymd(2025, 7, 1).unwrap();
        svc.prepare(asof).unwrap();
        assert!(matches!(
            svc.invoke(asof),
            Err(ValuationError::ExitStatus { .. })
        ));
    }

    #[test]
    fn test_timeout_kills_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(dir.path(), "sleep 5", Some(1));
        let asof = Date::from_ymd(2025, 7, 1).unwrap();
        svc.prepare(asof).unwrap();
        let started = Instant::now();
        assert!(matches!(
            svc.invoke(asof),
            Err(ValuationError::Timeout { timeout_secs: 1, .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(dir.path(), "exit 0", None);
        svc.config.program = dir.path().join("absent").display().to_string();
        let asof = Date::from_ymd(2025, 7, 1).unwrap();
        svc.prepare(asof).unwrap();
        assert!(matches!(svc.invoke(asof), Err(ValuationError::Spawn { .. })));
    }
}
