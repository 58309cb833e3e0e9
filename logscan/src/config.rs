use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Configuration for a scan, shared by all variants.
///
/// # Configuration Locations
///
/// Values can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.logscan.yaml` in the current directory
/// 3. Global `$HOME/.config/logscan/config.yaml`
///
/// # Configuration Format
///
/// The configuration uses YAML format. Example:
/// ```yaml
/// # Keyword to count (fixed substring, no pattern syntax)
/// keyword: "error"
///
/// # File to scan
/// path: "logs/app.log"
///
/// # Threads per process (default: CPU cores)
/// thread_count: 4
///
/// # Processes for the hybrid variant, coordinator included (default: 1)
/// process_count: 2
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
///
/// # Print each matching line as it is found
/// print_matches: false
/// ```
///
/// # CLI Integration
///
/// Command-line arguments take precedence over config file values. The
/// merging behavior is defined in the `merge_with_cli` method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// The keyword to count. An empty keyword is legal and matches no line.
    pub keyword: String,

    /// The file to scan. Only the coordinating process ever opens it.
    pub path: PathBuf,

    /// Threads per process, defaults to the number of CPU cores
    pub thread_count: NonZeroUsize,

    /// Total processes taking part in the hybrid variant, the coordinator
    /// included. A value of 1 keeps the whole scan inside the current
    /// process.
    pub process_count: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to print each matching line as it is found
    pub print_matches: bool,
}

pub(crate) fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap()
}

pub(crate) fn default_process_count() -> NonZeroUsize {
    NonZeroUsize::new(1).unwrap()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            path: PathBuf::new(),
            thread_count: default_thread_count(),
            process_count: default_process_count(),
            log_level: default_log_level(),
            print_matches: false,
        }
    }
}

impl ScanConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration, layering an optional custom file on top of the
    /// default locations. The custom file must exist; the defaults are
    /// skipped silently when absent.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let default_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("logscan/config.yaml")),
            // Local config
            Some(PathBuf::from(".logscan.yaml")),
        ];

        for path in default_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // A custom config file was asked for by name, so a missing one is an error
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values.
    ///
    /// Keyword and path are required on the command line and always win.
    /// The remaining fields win only when they differ from their defaults,
    /// so an untouched flag leaves the file value in place.
    pub fn merge_with_cli(mut self, cli_config: ScanConfig) -> Self {
        self.keyword = cli_config.keyword;
        if !cli_config.path.as_os_str().is_empty() {
            self.path = cli_config.path;
        }
        if cli_config.thread_count != default_thread_count() {
            self.thread_count = cli_config.thread_count;
        }
        if cli_config.process_count != default_process_count() {
            self.process_count = cli_config.process_count;
        }
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }
        if cli_config.print_matches {
            self.print_matches = true;
        }
        self
    }
}
