use std::time::Instant;
use tracing::{debug, info};

use super::matcher::KeywordMatcher;
use super::scanner::{LocalScanner, MatchOrigin};
use crate::config::ScanConfig;
use crate::errors::ScanResult;
use crate::results::ScanReport;
use crate::store::LineStore;

/// Scans the file on the current thread, one line after the other.
///
/// This is the baseline the parallel variants are measured against. The
/// clock covers only the scan itself; ingest stays outside, as in every
/// other variant.
pub fn scan_serial(config: &ScanConfig) -> ScanResult<ScanReport> {
    info!(
        "Starting serial scan of {} for {:?}",
        config.path.display(),
        config.keyword
    );

    let store = LineStore::read_from(&config.path)?;
    let matcher = KeywordMatcher::new(&config.keyword);
    debug!("Scanning {} lines on one thread", store.len());

    let started = Instant::now();
    let mut matching = 0u64;
    for line in store.lines() {
        if matcher.is_match(line) {
            matching += 1;
            if config.print_matches {
                println!("[match] {line}");
            }
        }
    }
    let elapsed = started.elapsed();

    info!("Serial scan complete: {} matching lines", matching);
    Ok(ScanReport {
        keyword: config.keyword.clone(),
        path: config.path.clone(),
        matching_lines: matching,
        lines_scanned: store.len() as u64,
        elapsed,
        processes: 1,
        threads: 1,
    })
}

/// Scans the file with a shared-memory thread pool in this process.
pub fn scan_threads(config: &ScanConfig) -> ScanResult<ScanReport> {
    info!(
        "Starting threaded scan of {} for {:?} on {} threads",
        config.path.display(),
        config.keyword,
        config.thread_count
    );

    let store = LineStore::read_from(&config.path)?;
    let matcher = KeywordMatcher::new(&config.keyword);
    let mut scanner = LocalScanner::new(matcher, config.thread_count)?;
    if config.print_matches {
        scanner = scanner.echo_matches(MatchOrigin::Local);
    }
    debug!("Scanning {} lines on {} threads", store.len(), scanner.threads());

    let started = Instant::now();
    let matching = scanner.count(store.lines());
    let elapsed = started.elapsed();

    info!("Threaded scan complete: {} matching lines", matching);
    Ok(ScanReport {
        keyword: config.keyword.clone(),
        path: config.path.clone(),
        matching_lines: matching,
        lines_scanned: store.len() as u64,
        elapsed,
        processes: 1,
        threads: scanner.threads(),
    })
}
