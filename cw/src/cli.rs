//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// commitwatch - live Git status for whatever directory you are in
#[derive(Parser)]
#[command(
    name = "commitwatch",
    about = "Watch the Git repository your shell or editor announces",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute; `watch` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Listen for path notifications and show the announced repository
    Watch {
        /// Print plain text instead of the full-screen view
        #[arg(long)]
        plain: bool,
    },

    /// Announce a path to a running watcher
    Notify {
        /// Directory to watch
        path: PathBuf,
    },

    /// Print files, branches and recent commits once
    Status {
        /// Repository path (default: current directory)
        path: Option<PathBuf>,

        /// Number of commits to show
        #[arg(short = 'n', long)]
        max_commits: Option<usize>,
    },

    /// Print recent commits once
    Log {
        /// Repository path (default: current directory)
        path: Option<PathBuf>,

        /// Number of commits to show
        #[arg(short = 'n', long)]
        max_commits: Option<usize>,
    },
}
