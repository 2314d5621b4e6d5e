//! CLI definitions for OmniFlow.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// OmniFlow CLI.
#[derive(Parser)]
#[command(name = "omniflow")]
#[command(about = "Workflow orchestration engine for multi-agent task plans")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run a workflow plan against the built-in mock agents
    Run {
        /// Plan file (.json, .yaml or .yml)
        plan: PathBuf,

        /// Override the plan's owner id
        #[arg(long)]
        owner: Option<String>,

        /// Cancel the workflow if it has not finished after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Do not stream lifecycle events while running
        #[arg(short, long)]
        quiet: bool,

        /// Output format for the final result
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check a workflow plan without running it
    Validate {
        /// Plan file (.json, .yaml or .yml)
        plan: PathBuf,
    },

    /// Print the JSON schema of workflow plan files
    Schema,

    /// List stored workflows
    List {
        /// Filter by owner id
        #[arg(long)]
        owner: Option<String>,

        /// Filter by status (pending, running, paused, completed, failed, cancelled)
        #[arg(long)]
        status: Option<String>,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show one stored workflow
    Show {
        /// Workflow ID
        id: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}
