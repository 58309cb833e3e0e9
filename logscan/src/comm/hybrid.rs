use std::net::TcpListener;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::cluster::{CoordinatorLinks, WorkerLink};
use super::launch::WorkerPool;
use super::protocol::{ENV_COORDINATOR, ENV_RANK, ENV_THREADS, ENV_WORLD_SIZE};
use crate::config::ScanConfig;
use crate::errors::{ScanError, ScanResult};
use crate::partition::partition_for;
use crate::results::ScanReport;
use crate::scan::matcher::KeywordMatcher;
use crate::scan::scanner::{LocalScanner, MatchOrigin};
use crate::store::LineStore;

/// Which side of the cluster this process is on, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// The process the user started: owns the file, the listener, and the report
    Coordinator,
    /// A spawned process that scans one shard and reports one count
    Worker(WorkerEnv),
}

/// The launch contract a worker process reads from its environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEnv {
    pub rank: usize,
    pub world_size: usize,
    pub coordinator: String,
    pub threads: NonZeroUsize,
}

impl Role {
    /// Resolves the role from the process environment. A process without
    /// `LOGSCAN_RANK` is the coordinator; one with it must carry the whole
    /// launch contract.
    pub fn from_env() -> ScanResult<Self> {
        let [rank, world_size, coordinator, threads] =
            [ENV_RANK, ENV_WORLD_SIZE, ENV_COORDINATOR, ENV_THREADS]
                .map(|name| std::env::var(name).ok());
        Self::resolve(rank, world_size, coordinator, threads)
    }

    fn resolve(
        rank: Option<String>,
        world_size: Option<String>,
        coordinator: Option<String>,
        threads: Option<String>,
    ) -> ScanResult<Self> {
        if rank.is_none() {
            return Ok(Role::Coordinator);
        }

        let rank = parse_var(ENV_RANK, rank)?;
        let world_size = parse_var(ENV_WORLD_SIZE, world_size)?;
        let coordinator = coordinator.ok_or_else(|| missing_var(ENV_COORDINATOR))?;
        let threads = NonZeroUsize::new(parse_var(ENV_THREADS, threads)?)
            .ok_or_else(|| ScanError::protocol(format!("{ENV_THREADS} must be at least 1")))?;

        if rank == 0 || rank >= world_size {
            return Err(ScanError::protocol(format!(
                "{ENV_RANK}={rank} is outside the worker range 1..{world_size}"
            )));
        }

        Ok(Role::Worker(WorkerEnv {
            rank,
            world_size,
            coordinator,
            threads,
        }))
    }
}

fn missing_var(name: &str) -> ScanError {
    ScanError::protocol(format!("{ENV_RANK} is set but {name} is missing"))
}

fn parse_var(name: &str, value: Option<String>) -> ScanResult<usize> {
    let value = value.ok_or_else(|| missing_var(name))?;
    value
        .parse()
        .map_err(|_| ScanError::protocol(format!("{name}={value} is not a number")))
}

/// One process's view of the hybrid pipeline.
///
/// The role is fixed before the pipeline starts; nothing downstream checks
/// ranks to decide what to do. Only the coordinator produces a report,
/// workers return `None` and leave all output to the process that started
/// the run.
pub trait Participant {
    /// This process's rank, 0 for the coordinator
    fn rank(&self) -> usize;

    /// Runs this side of the pipeline to completion
    fn run(self: Box<Self>) -> ScanResult<Option<ScanReport>>;
}

/// The user-facing process: ingests the file, distributes shards, scans its
/// own share, and folds every count into the report.
pub struct Coordinator {
    config: ScanConfig,
}

impl Coordinator {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    fn scanner(&self) -> ScanResult<LocalScanner> {
        let matcher = KeywordMatcher::new(&self.config.keyword);
        let mut scanner = LocalScanner::new(matcher, self.config.thread_count)?;
        if self.config.print_matches {
            scanner = scanner.echo_matches(MatchOrigin::Rank(0));
        }
        Ok(scanner)
    }

    fn report(&self, matching_lines: u64, nlines: usize, elapsed: Duration) -> ScanReport {
        ScanReport {
            keyword: self.config.keyword.clone(),
            path: self.config.path.clone(),
            matching_lines,
            lines_scanned: nlines as u64,
            elapsed,
            processes: self.config.process_count.get(),
            threads: self.config.thread_count.get(),
        }
    }
}

impl Participant for Coordinator {
    fn rank(&self) -> usize {
        0
    }

    fn run(self: Box<Self>) -> ScanResult<Option<ScanReport>> {
        let world_size = self.config.process_count.get();
        let store = LineStore::read_from(&self.config.path)?;
        let nlines = store.len();
        let scanner = self.scanner()?;

        if world_size == 1 {
            // Single process: no listener, no children, no traffic
            info!("Running hybrid scan in-process, no worker processes requested");
            let started = Instant::now();
            let matching = scanner.count(store.lines());
            let elapsed = started.elapsed();
            return Ok(Some(self.report(matching, nlines, elapsed)));
        }

        info!(
            "Coordinating {} worker processes for {} lines",
            world_size - 1,
            nlines
        );
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        // The listener must exist before the first child starts connecting
        let mut pool = WorkerPool::spawn(world_size, self.config.thread_count, addr)?;
        let mut links = CoordinatorLinks::accept(&listener, world_size)?;

        links.broadcast_line_count(nlines as u64)?;
        for rank in 1..world_size {
            links.send_shard(rank, store.slice(partition_for(nlines, world_size, rank)))?;
        }

        // Rank 0 keeps its own shard as a borrowed slice, no copy involved
        let own_share = store.slice(partition_for(nlines, world_size, 0));
        let started = Instant::now();
        let own_count = scanner.count(own_share);
        let total = links.reduce_counts(own_count)?;
        let elapsed = started.elapsed();

        pool.wait_all()?;
        info!("Hybrid scan complete: {} matching lines", total);
        Ok(Some(self.report(total, nlines, elapsed)))
    }
}

/// A spawned process: receives one shard, scans it, reports one count.
pub struct Worker {
    keyword: String,
    print_matches: bool,
    env: WorkerEnv,
}

impl Worker {
    pub fn new(config: &ScanConfig, env: WorkerEnv) -> Self {
        Self {
            keyword: config.keyword.clone(),
            print_matches: config.print_matches,
            env,
        }
    }
}

impl Participant for Worker {
    fn rank(&self) -> usize {
        self.env.rank
    }

    fn run(self: Box<Self>) -> ScanResult<Option<ScanReport>> {
        let mut link = WorkerLink::connect(&self.env.coordinator, self.env.rank)?;
        let nlines = link.recv_line_count()? as usize;
        // The same arithmetic the coordinator used, run locally
        let share = partition_for(nlines, self.env.world_size, self.env.rank);
        let lines = link.recv_shard(share.count)?;

        let matcher = KeywordMatcher::new(&self.keyword);
        let mut scanner = LocalScanner::new(matcher, self.env.threads)?;
        if self.print_matches {
            scanner = scanner.echo_matches(MatchOrigin::Rank(self.env.rank));
        }
        let count = scanner.count(&lines);
        link.send_count(count)?;
        debug!("Rank {} reported {} matching lines", self.env.rank, count);
        Ok(None)
    }
}

/// Builds the participant for this process, coordinator or worker, from
/// the environment. The choice is made exactly once per process.
pub fn participant(config: &ScanConfig) -> ScanResult<Box<dyn Participant>> {
    Ok(match Role::from_env()? {
        Role::Coordinator => Box::new(Coordinator::new(config.clone())),
        Role::Worker(env) => Box::new(Worker::new(config, env)),
    })
}

/// Runs the two-tier scan: shards the file across processes, scans each
/// shard with a thread pool, and sums the counts on the coordinator.
///
/// Returns the report on the coordinator and `None` on workers.
pub fn scan_hybrid(config: &ScanConfig) -> ScanResult<Option<ScanReport>> {
    participant(config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn resolve(
        rank: Option<&str>,
        world_size: Option<&str>,
        coordinator: Option<&str>,
        threads: Option<&str>,
    ) -> ScanResult<Role> {
        Role::resolve(
            rank.map(String::from),
            world_size.map(String::from),
            coordinator.map(String::from),
            threads.map(String::from),
        )
    }

    #[test]
    fn test_no_rank_resolves_to_coordinator() {
        let role = resolve(None, None, None, None).unwrap();
        assert_eq!(role, Role::Coordinator);
    }

    #[test]
    fn test_complete_contract_resolves_to_worker() {
        let role = resolve(Some("2"), Some("4"), Some("127.0.0.1:9000"), Some("3")).unwrap();
        assert_eq!(
            role,
            Role::Worker(WorkerEnv {
                rank: 2,
                world_size: 4,
                coordinator: "127.0.0.1:9000".to_string(),
                threads: NonZeroUsize::new(3).unwrap(),
            })
        );
    }

    #[test]
    fn test_incomplete_contract_is_rejected() {
        assert!(resolve(Some("1"), None, Some("127.0.0.1:9000"), Some("1")).is_err());
        assert!(resolve(Some("1"), Some("2"), None, Some("1")).is_err());
        assert!(resolve(Some("1"), Some("2"), Some("127.0.0.1:9000"), None).is_err());
    }

    #[test]
    fn test_malformed_contract_is_rejected() {
        assert!(resolve(Some("one"), Some("2"), Some("c"), Some("1")).is_err());
        assert!(resolve(Some("1"), Some("two"), Some("c"), Some("1")).is_err());
        assert!(resolve(Some("1"), Some("2"), Some("c"), Some("0")).is_err());
    }

    #[test]
    fn test_out_of_range_rank_is_rejected() {
        assert!(resolve(Some("0"), Some("2"), Some("c"), Some("1")).is_err());
        assert!(resolve(Some("2"), Some("2"), Some("c"), Some("1")).is_err());
    }

    #[test]
    fn test_single_process_run_stays_in_process() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = File::create(&path).unwrap();
        for line in ["error: disk full", "ok", "error: timeout", "ok"] {
            writeln!(file, "{line}").unwrap();
        }
        drop(file);

        let config = ScanConfig {
            keyword: "error".to_string(),
            path,
            thread_count: NonZeroUsize::new(2).unwrap(),
            ..Default::default()
        };

        let report = scan_hybrid(&config).unwrap().expect("coordinator report");
        assert_eq!(report.matching_lines, 2);
        assert_eq!(report.lines_scanned, 4);
        assert_eq!(report.processes, 1);
    }
}
