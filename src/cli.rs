//! CLI argument parsing for churnbench

use clap::{Parser, ValueEnum};

/// Output format for the run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text block (default)
    Text,
    /// JSON document with configuration and results
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "churnbench")]
#[command(version)]
#[command(
    about = "Seeded slot-churn workload measuring allocator throughput and peak RSS",
    long_about = None
)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Label printed above the results
    #[arg(long = "label", value_name = "TEXT", default_value = "system allocator")]
    pub label: String,

    /// Override the number of churn rounds (default: 50000) for smoke runs
    #[arg(long = "rounds", value_name = "N")]
    pub rounds: Option<u64>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
