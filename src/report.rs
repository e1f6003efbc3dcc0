//! Aggregates per-host outcomes and renders the run summary and
//! `failures.csv`, grounded on `netcfgbu/report.py`.

use crate::consts::FAILURES_REPORT_FILENAME;
use crate::error::{Error, Result};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

/// One row of the failures report.
pub struct Failure {
    pub host: String,
    pub os_name: String,
    pub reason: String,
}

/// Collects outcomes across a run. Updated only by the scheduler's single
/// consumer, never by individual tasks — see the concurrency model.
pub struct Report {
    started_at: Instant,
    started_wall: SystemTime,
    finished_at: Option<Instant>,
    total: usize,
    ok: usize,
    failures: Vec<Failure>,
}

impl Report {
    pub fn start(total: usize) -> Self {
        Self {
            started_at: Instant::now(),
            started_wall: SystemTime::now(),
            finished_at: None,
            total,
            ok: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.ok += 1;
    }

    pub fn record_failure(&mut self, host: impl Into<String>, os_name: impl Into<String>, err: &Error) {
        self.failures.push(Failure {
            host: host.into(),
            os_name: os_name.into(),
            reason: err.report_reason(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    pub fn duration(&self) -> Duration {
        self.finished_at
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.started_at)
    }

    pub fn started_wall(&self) -> SystemTime {
        self.started_wall
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn ok(&self) -> usize {
        self.ok
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// One-line human summary, e.g. `"TOTAL=3 OK=2 FAIL=1 in 4.2s"`.
    pub fn summary(&self) -> String {
        format!(
            "TOTAL={} OK={} FAIL={} in {:.1}s",
            self.total,
            self.ok,
            self.failed(),
            self.duration().as_secs_f64()
        )
    }

    /// Writes `failures.csv` (columns `host, os_name, reason`) into `dir`
    /// when any task failed; a no-op otherwise.
    pub fn write_failures_csv(&self, dir: &Path) -> Result<Option<std::path::PathBuf>> {
        if self.failures.is_empty() {
            return Ok(None);
        }
        let path = dir.join(FAILURES_REPORT_FILENAME);
        let mut writer = csv::WriterBuilder::new()
            .from_path(&path)
            .map_err(|e| Error::Other {
                message: format!("failed to write {}", path.display()),
                source: Some(Box::new(e)),
            })?;
        writer
            .write_record(["host", "os_name", "reason"])
            .map_err(|e| Error::Other {
                message: "failed to write failures.csv header".to_string(),
                source: Some(Box::new(e)),
            })?;
        for failure in &self.failures {
            writer
                .write_record([&failure.host, &failure.os_name, &failure.reason])
                .map_err(|e| Error::Other {
                    message: "failed to write failures.csv row".to_string(),
                    source: Some(Box::new(e)),
                })?;
        }
        writer.flush()?;
        Ok(Some(path))
    }
}
