use std::path::PathBuf;
use std::time::Duration;

/// The outcome of a completed scan, produced only by the process that
/// holds the global count.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// The keyword that was counted
    pub keyword: String,
    /// The file that was scanned
    pub path: PathBuf,
    /// Number of lines containing the keyword at least once
    pub matching_lines: u64,
    /// Total number of lines in the file
    pub lines_scanned: u64,
    /// Wall-clock time of the scan phase, ingest and distribution excluded
    pub elapsed: Duration,
    /// Number of processes that took part
    pub processes: usize,
    /// Threads per process
    pub threads: usize,
}

impl ScanReport {
    /// Elapsed scan time in fractional seconds, as reported to the user
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Total number of scanning units across the whole run
    pub fn parallelism(&self) -> usize {
        self.processes * self.threads
    }
}
