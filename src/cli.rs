//! CLI arguments and subcommands for herakles-pulse.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::config::{SamplerScope, SamplingMode};

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-pulse",
    about = "Live host CPU and RAM usage as JSON or a Server-Sent-Events stream",
    long_about = "Live host CPU and RAM usage as JSON or a Server-Sent-Events stream.\n\n\
                  Serves /metrics for polling clients and /metrics/stream for browsers \
                  that want a push feed, sampling cumulative OS counters on every tick.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "Project: https://github.com/cansp-dev/herakles-pulse — Support: exporter@herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (overrides log_level from the config file, default info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Stream tick interval in milliseconds
    #[arg(short = 'i', long)]
    pub interval_ms: Option<u64>,

    /// Value of the Access-Control-Allow-Origin header
    #[arg(long)]
    pub cors_origin: Option<String>,

    /// How CPU deltas are taken
    #[arg(long, value_enum)]
    pub sampling_mode: Option<SamplingMode>,

    /// Gap between the two reads in window sampling mode (milliseconds)
    #[arg(long)]
    pub window_ms: Option<u64>,

    /// Whether each stream keeps its own CPU baseline
    #[arg(long, value_enum)]
    pub sampler_scope: Option<SamplerScope>,

    /// Root of the proc filesystem to read counters from
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and metric sources
    Check,

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Sample usage a few times and print the reports
    Test {
        /// Number of samples to take
        #[arg(short = 'n', long, default_value_t = 5)]
        iterations: usize,

        /// Print the detailed report instead of cpu/ram only
        #[arg(long)]
        verbose: bool,
    },
}
