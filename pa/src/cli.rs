//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pipeagent - Natural-language to data-pipeline generator
#[derive(Parser)]
#[command(
    name = "pipeagent",
    about = "Generate data pipelines from natural-language requests",
    version,
    after_help = "Logs are written to stderr; outcomes are written to stdout as JSON."
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level override
    #[arg(short, long, global = true, help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Handle a single request and print the outcome
    Generate {
        /// Request text
        request: String,
    },

    /// Handle JSON-lines records ({"request": ...}) and print one outcome per line
    Batch {
        /// Input file (reads stdin when omitted)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Run the code safety analyzer on a Python file
    Check {
        /// Python source file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// List configured tools
    Tools,
}
