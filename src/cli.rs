//! CLI argument parsing and command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command output compressor for AI coding agents
#[derive(Parser)]
#[command(
    name = "token-saver",
    version,
    about = "Command output compressor for AI coding agents",
    long_about = "Routes captured command output through priority-ordered processors \
                  that keep errors and summaries while dropping noise, and rewrites \
                  compressible Bash tool calls through a PreToolUse hook."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Process a PreToolUse hook event from stdin (alias: run)
    #[command(alias = "run")]
    Hook,
    /// Run a command and print its compressed output
    Wrap {
        /// Session the savings are recorded under
        #[arg(long)]
        session: Option<String>,
        /// Command line to run with `sh -c`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Compress captured output read from stdin
    Compress {
        /// Command that produced the output
        #[arg(long)]
        command: String,
        /// Print the routing result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the combined hook pattern set
    Patterns {
        /// Print as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print processors in routing order
    Processors,
    /// Process a SessionStart hook event from stdin and report savings
    Session,
    /// Show recorded savings
    Stats {
        /// Session to report (default: TOKEN_SAVER_SESSION)
        #[arg(long)]
        session: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate default configuration file
    Init {
        /// Path where to create the configuration file
        #[arg(long, short = 'p')]
        path: Option<PathBuf>,
    },
    /// Validate configuration file and processor registry
    Check,
    /// Display version information
    Version,
}
