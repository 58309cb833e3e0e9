pub mod comm;
pub mod config;
pub mod errors;
pub mod partition;
pub mod results;
pub mod scan;
pub mod store;

pub use comm::scan_hybrid;
pub use config::ScanConfig;
pub use errors::{ScanError, ScanResult};
pub use partition::{partition_for, partitions, Partition};
pub use results::ScanReport;
pub use scan::{scan_serial, scan_threads};
pub use store::LineStore;
