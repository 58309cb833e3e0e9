use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use logscan::{scan_hybrid, scan_serial, scan_threads, ScanConfig, ScanError, ScanReport};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, ScanError>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScanArgs {
    /// File to scan
    file: PathBuf,

    /// Keyword to count (fixed substring, no pattern syntax)
    keyword: String,

    /// Number of threads per process
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Path to a YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print each matching line as it is found
    #[arg(long)]
    print_matches: bool,
}

#[derive(Args)]
struct HybridArgs {
    #[command(flatten)]
    scan: ScanArgs,

    /// Total number of processes, this one included
    #[arg(short = 'n', long)]
    processes: Option<NonZeroUsize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Count matching lines on a single thread
    Serial(ScanArgs),

    /// Count matching lines with a thread pool in this process
    Threads(ScanArgs),

    /// Count matching lines across worker processes, each with its own
    /// thread pool
    Hybrid(HybridArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serial(args) => {
            let config = prepare(&args, None)?;
            print_report(&scan_serial(&config)?);
        }
        Commands::Threads(args) => {
            let config = prepare(&args, None)?;
            print_report(&scan_threads(&config)?);
        }
        Commands::Hybrid(args) => {
            let config = prepare(&args.scan, args.processes)?;
            // Workers come back with None and must print nothing
            if let Some(report) = scan_hybrid(&config)? {
                print_report(&report);
            }
        }
    }
    Ok(())
}

/// Loads the layered configuration, applies CLI overrides, and brings up
/// logging with the resolved level.
fn prepare(args: &ScanArgs, processes: Option<NonZeroUsize>) -> Result<ScanConfig> {
    let file_config = ScanConfig::load_from(args.config.as_deref())
        .map_err(|e| ScanError::config_error(e.to_string()))?;

    let defaults = ScanConfig::default();
    let cli_config = ScanConfig {
        keyword: args.keyword.clone(),
        path: args.file.clone(),
        thread_count: args.threads.unwrap_or(defaults.thread_count),
        process_count: processes.unwrap_or(defaults.process_count),
        log_level: args.log_level.clone().unwrap_or(defaults.log_level),
        print_matches: args.print_matches,
    };

    let config = file_config.merge_with_cli(cli_config);
    init_logging(&config.log_level);
    debug!(
        "Scanning {} for {:?} with {} processes x {} threads",
        config.path.display(),
        config.keyword,
        config.process_count,
        config.thread_count
    );
    Ok(config)
}

/// `RUST_LOG` wins over the configured level; an unparsable level falls
/// back to warnings only.
fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &ScanReport) {
    println!(
        "The keyword '{}' appeared {} times in '{}'",
        report.keyword.green(),
        report.matching_lines,
        report.path.display().to_string().blue()
    );
    println!(
        "Scanned {} lines in {:.6} seconds ({} processes x {} threads)",
        report.lines_scanned,
        report.elapsed_secs(),
        report.processes,
        report.threads
    );
}
