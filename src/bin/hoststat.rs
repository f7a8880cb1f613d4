//! hoststat - one-shot host telemetry report.
//!
//! Collects CPU, disk I/O, memory, swap, filesystem, host and process
//! statistics once and prints one JSON line per metric to stdout. Failed
//! metrics are reported as JSON lines on stderr.

use std::io::{self, BufWriter};
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use hoststat::LiveCollector;
use hoststat::report::{EXIT_INIT_FAILED, run_report, write_fatal};

/// Host telemetry as JSON lines.
#[derive(Parser)]
#[command(name = "hoststat", about = "Host telemetry as JSON lines", version)]
struct Args {
    /// Path to /proc filesystem (for testing against a copied tree).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is error level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - no diagnostic logging at all.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
///
/// Logs share stderr with error lines, so the default keeps them to errors.
/// `RUST_LOG` directives take precedence over the flags.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::OFF
    } else {
        match verbose {
            0 => LevelFilter::ERROR,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let collector = match LiveCollector::live(&args.proc_path) {
        Ok(c) => c,
        Err(e) => {
            debug!("collector initialization failed: {}", e);
            if let Err(write_err) = write_fatal(io::stderr(), &e) {
                error!("Failed to report initialization failure: {}", write_err);
            }
            return ExitCode::from(EXIT_INIT_FAILED);
        }
    };
    debug!(
        "collecting from {} (page size {}, {} ticks/s)",
        args.proc_path,
        collector.scale().page_size,
        collector.scale().clock_ticks
    );

    let summary = run_report(&collector, BufWriter::new(io::stdout().lock()), io::stderr());

    if let Err(e) = collector.shutdown() {
        debug!("shutdown failed: {}", e);
    }

    match summary {
        Ok(summary) => ExitCode::from(summary.exit_code()),
        Err(e) => {
            error!("Failed to write report: {}", e);
            ExitCode::FAILURE
        }
    }
}
