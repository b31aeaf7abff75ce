//! On-disk layout of report files.

use {
    crate::error::Result,
    log::{debug, info},
    std::{
        fs,
        path::{Path, PathBuf},
    },
};

/// Suffix appended to a failed report while a retry run is consuming
/// it. A crash mid-retry leaves the `.BUSY` twin behind; the cleanup
/// pass removes it once the cycle's done report exists.
pub const BUSY_SUFFIX: &str = ".BUSY";

/// Resolver for every report path the pipeline reads or writes.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    payments_root: PathBuf,
    calculations_root: PathBuf,
}

impl ReportPaths {
    pub fn new(payments_root: impl Into<PathBuf>, calculations_root: impl Into<PathBuf>) -> Self {
        Self {
            payments_root: payments_root.into(),
            calculations_root: calculations_root.into(),
        }
    }

    /// Create the directory skeleton. Idempotent.
    pub fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(self.done_dir())?;
        fs::create_dir_all(self.failed_dir())?;
        fs::create_dir_all(&self.calculations_root)?;
        Ok(())
    }

    pub fn done_dir(&self) -> PathBuf {
        self.payments_root.join("done")
    }

    pub fn failed_dir(&self) -> PathBuf {
        self.payments_root.join("failed")
    }

    pub fn done_report(&self, cycle: u64) -> PathBuf {
        self.done_dir().join(format!("{cycle}.csv"))
    }

    pub fn failed_report(&self, cycle: u64) -> PathBuf {
        self.failed_dir().join(format!("{cycle}.csv"))
    }

    /// The failure report actually on disk for `cycle`: the plain file,
    /// or the `.BUSY` twin a crashed retry left behind.
    pub fn existing_failed_report(&self, cycle: u64) -> Option<PathBuf> {
        let report = self.failed_report(cycle);
        if report.exists() {
            return Some(report);
        }
        let busy = busy_twin(&report);
        busy.exists().then_some(busy)
    }

    pub fn calculation_report(&self, cycle: u64) -> PathBuf {
        self.calculations_root.join(format!("{cycle}.csv"))
    }

    /// Whether the cycle was already fully settled in a previous run.
    pub fn is_cycle_paid(&self, cycle: u64) -> bool {
        self.done_report(cycle).exists()
    }

    /// Cycles with a pending failed report, oldest first. `.BUSY` twins
    /// of a crashed retry count too.
    pub fn failed_cycles(&self, initial_cycle: u64) -> Result<Vec<u64>> {
        let mut cycles = Vec::new();
        let dir = self.failed_dir();
        if !dir.exists() {
            return Ok(cycles);
        }
        for dirent in fs::read_dir(&dir)? {
            let name = dirent?.file_name();
            let Some(name) = name.to_str() else { continue };
            let stem = name
                .strip_suffix(BUSY_SUFFIX)
                .unwrap_or(name)
                .strip_suffix(".csv");
            if let Some(cycle) = stem.and_then(|s| s.parse::<u64>().ok()) {
                if cycle >= initial_cycle && !cycles.contains(&cycle) {
                    cycles.push(cycle);
                }
            }
        }
        cycles.sort_unstable();
        Ok(cycles)
    }

    /// Rename a failed report to its `.BUSY` twin before retrying it,
    /// so a concurrent scan does not pick it up twice. Returns the busy
    /// path.
    pub fn mark_busy(&self, report: &Path) -> Result<PathBuf> {
        let busy = busy_twin(report);
        fs::rename(report, &busy)?;
        debug!("renamed {} to busy twin", report.display());
        Ok(busy)
    }

    /// Drop the failure artifacts of a settled cycle (both the report
    /// and a stale `.BUSY` twin, whichever exist).
    pub fn remove_failure_artifacts(&self, cycle: u64) -> Result<()> {
        let report = self.failed_report(cycle);
        for path in [busy_twin(&report), report] {
            if path.exists() {
                fs::remove_file(&path)?;
                info!("removed stale failure artifact {}", path.display());
            }
        }
        Ok(())
    }
}

fn busy_twin(report: &Path) -> PathBuf {
    let mut name = report.as_os_str().to_os_string();
    name.push(BUSY_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(root: &Path) -> ReportPaths {
        ReportPaths::new(root.join("payments"), root.join("calculations"))
    }

    #[test]
    fn test_layout_and_paid_check() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        paths.ensure_layout().unwrap();

        assert!(!paths.is_cycle_paid(500));
        fs::write(paths.done_report(500), "address,type\n").unwrap();
        assert!(paths.is_cycle_paid(500));
    }

    #[test]
    fn test_failed_cycle_scan_includes_busy_twins() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        paths.ensure_layout().unwrap();

        fs::write(paths.failed_report(501), "").unwrap();
        fs::write(busy_twin(&paths.failed_report(502)), "").unwrap();
        fs::write(paths.failed_dir().join("junk.txt"), "").unwrap();
        // Below the initial cycle, ignored.
        fs::write(paths.failed_report(7), "").unwrap();

        assert_eq!(paths.failed_cycles(100).unwrap(), vec![501, 502]);
    }

    #[test]
    fn test_busy_rename_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        paths.ensure_layout().unwrap();

        let report = paths.failed_report(503);
        fs::write(&report, "").unwrap();
        let busy = paths.mark_busy(&report).unwrap();
        assert!(!report.exists());
        assert!(busy.exists());

        paths.remove_failure_artifacts(503).unwrap();
        assert!(!busy.exists());
    }
}
