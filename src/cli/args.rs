//! CLI argument definitions using clap
//!
//! Commands:
//! - duckpage serve --config <path>
//! - duckpage check-init --file <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// duckpage - serve HTML rendered by SQL macros
#[derive(Parser, Debug)]
#[command(name = "duckpage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Provision the store and serve pages
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./duckpage.json")]
        config: PathBuf,
    },

    /// Split an init script and print its statements without running them
    CheckInit {
        /// Path to the init SQL script
        #[arg(long)]
        file: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
