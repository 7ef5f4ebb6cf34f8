//! CLI argument definitions for sentinel-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use clap::builder::RangedU64ValueParser;

use sentinel_log_stream::MAX_BURST;

/// Sentinel log stream monitoring daemon.
///
/// Synthesizes HTTP access-log traffic, classifies suspicious records
/// and exposes an operator console on stdin.
#[derive(Parser, Debug)]
#[command(name = "sentinel-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to sentinel.toml configuration file.
    ///
    /// Without it, built-in defaults plus environment overrides are used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Start in standby: the monitor is active but periodic generation is off.
    #[arg(long)]
    pub standby: bool,

    /// Push this many records immediately after startup (1-10000).
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_BURST as u64))]
    pub burst: Option<usize>,

    /// Seconds between status lines (0 disables them).
    #[arg(long, default_value_t = 10)]
    pub report_interval_secs: u64,

    /// Disable the stdin operator console.
    #[arg(long)]
    pub no_console: bool,
}
