pub mod engine;
pub mod matcher;
pub mod scanner;

pub use engine::{scan_serial, scan_threads};
pub use matcher::KeywordMatcher;
pub use scanner::{LocalScanner, MatchOrigin};
