//! Dutycycle CLI - Command-line driver for the duty-cycle simulator
//!
//! Runs generated populations or JSON scenario files and prints per-device reports.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use dutycycle_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "dutycycle")]
#[command(about = "Tick-exact simulator for duty-cycled broadcast devices")]
struct Cli {
    /// Console log level (RUST_LOG takes precedence)
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    /// Write a full trace-level log to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_tracing_level(), cli.log_file.as_deref())?;

    commands::handle_command(cli.command)
}
