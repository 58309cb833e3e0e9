pub mod cluster;
pub mod hybrid;
pub mod launch;
pub mod protocol;

pub use cluster::{CoordinatorLinks, WorkerLink};
pub use hybrid::{participant, scan_hybrid, Participant, Role};
pub use launch::WorkerPool;
