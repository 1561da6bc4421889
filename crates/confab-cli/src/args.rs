use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "confab",
    version,
    about = "Unified view over coding-assistant CLI conversation logs"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose diagnostics on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List sessions for a project across all sources
    Sessions {
        /// Project root (defaults to the current directory)
        #[arg(long)]
        project: Option<PathBuf>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the messages of one session
    Messages {
        /// Source adapter id (see `confab detect`)
        adapter: String,

        /// Session id
        session: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show aggregate token usage of one session
    Usage {
        adapter: String,
        session: String,
    },

    /// Report which sources have sessions for a project
    Detect {
        #[arg(long)]
        project: Option<PathBuf>,
    },

    /// Stream change events for a project until interrupted
    Watch {
        #[arg(long)]
        project: Option<PathBuf>,
    },
}
