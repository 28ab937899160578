//! sitefix CLI library: exposed for integration tests

pub mod commands;
pub mod output;
pub mod progress;
pub mod run_log;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sitefix")]
#[command(about = "Find PHP runtime errors in checked pages and fix them safely", long_about = None)]
#[command(version = sitefix_core::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, value_enum, global = true, default_value = "terminal")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract errors from page checks and apply fixes
    Fix {
        /// JSON file holding the page checks
        #[arg(long)]
        checks: PathBuf,

        /// Project root (default: current directory)
        path: Option<PathBuf>,

        /// Enable the AI fallback for errors no rule fixes
        #[arg(long)]
        ai: bool,

        /// Exit non-zero when any attempt failed
        #[arg(long)]
        fail_on_error: bool,
    },

    /// Extract and classify errors without touching any file
    Scan {
        /// JSON file holding the page checks
        #[arg(long)]
        checks: PathBuf,

        /// Project root (default: current directory)
        path: Option<PathBuf>,
    },

    /// List the effective fix rules after validation
    Rules {
        /// Project root (default: current directory)
        path: Option<PathBuf>,
    },

    /// Initialize .sitefix.toml configuration
    Init {
        /// Path to initialize (default: current directory)
        path: Option<PathBuf>,
    },

    /// Restore every file backed up during a session
    Restore {
        /// Session id printed by `sitefix fix`, or `latest`
        session: String,

        /// Project root (default: current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Send one minimal request to the configured AI provider
    AiHealth {
        /// Project root (default: current directory)
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Terminal,
    Json,
}
