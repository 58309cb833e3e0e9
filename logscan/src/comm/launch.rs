use std::env;
use std::ffi::OsString;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::process::{Child, Command};
use tracing::{debug, warn};

use super::protocol::{ENV_COORDINATOR, ENV_RANK, ENV_THREADS, ENV_WORLD_SIZE};
use crate::errors::{ScanError, ScanResult};

/// The worker processes launched for one hybrid run.
///
/// The coordinator re-executes its own binary once per worker rank, with
/// the original arguments and the environment contract filled in. Children
/// left behind by an aborted run are killed when the pool drops, so a
/// failure anywhere tears the whole system down.
pub struct WorkerPool {
    children: Vec<(usize, Child)>,
}

impl WorkerPool {
    /// Spawns ranks `1..world_size`, each pointed at the coordinator socket
    pub fn spawn(
        world_size: usize,
        threads: NonZeroUsize,
        coordinator: SocketAddr,
    ) -> ScanResult<Self> {
        let exe = env::current_exe()?;
        let args: Vec<OsString> = env::args_os().skip(1).collect();

        let mut pool = Self {
            children: Vec::with_capacity(world_size - 1),
        };
        for rank in 1..world_size {
            let child = Command::new(&exe)
                .args(&args)
                .env(ENV_RANK, rank.to_string())
                .env(ENV_WORLD_SIZE, world_size.to_string())
                .env(ENV_COORDINATOR, coordinator.to_string())
                .env(ENV_THREADS, threads.to_string())
                .spawn()?;
            debug!("Spawned worker rank {} as pid {}", rank, child.id());
            pool.children.push((rank, child));
        }
        Ok(pool)
    }

    /// Reaps every worker and fails on the first abnormal exit. Workers
    /// still pending after a failure are killed by the pool's drop.
    pub fn wait_all(&mut self) -> ScanResult<()> {
        while let Some((rank, mut child)) = self.children.pop() {
            let status = child.wait()?;
            if !status.success() {
                return Err(ScanError::worker_failed(rank, status));
            }
            debug!("Worker rank {} exited cleanly", rank);
        }
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for (rank, child) in &mut self.children {
            warn!("Killing worker rank {} left over from an aborted run", rank);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
