//! Space Time Stack CLI
//!
//! Replays recorded runtime event traces and prints the merged
//! time/memory profile.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use space_time_stack::commands::{
    display_version, execute_replay, validate_trace_file, ReplayArgs,
};
use space_time_stack::utils::config::CONFIG_ENV_VAR;

/// Space Time Stack - hierarchical time and memory profiles
#[derive(Parser, Debug)]
#[command(name = "space-time-stack")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay an event trace and print the profiling report
    Replay {
        /// Path to the JSON event trace
        #[arg(short, long)]
        trace: PathBuf,

        /// TOML report configuration
        #[arg(short, long, env = CONFIG_ENV_VAR)]
        config: Option<PathBuf>,
    },

    /// Validate an event trace file
    Validate {
        /// Path to the JSON event trace
        #[arg(short, long)]
        trace: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging; logs go to stderr so the report stays clean on stdout
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Replay { trace, config } => {
            execute_replay(ReplayArgs { trace, config })?;
        }

        Commands::Validate { trace } => {
            validate_trace_file(&trace)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
