// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use keel::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Release-based deployment with atomic cutover and automatic rollback")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: keel.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new keel.yml configuration file
    Init {
        /// Deploy root on this host
        #[arg(long)]
        deploy_to: Option<String>,

        /// Git repository to deploy from
        #[arg(long)]
        repository: Option<String>,

        /// Overwrite an existing keel.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Deploy the configured revision
    Deploy {
        /// Revision to deploy (overrides config)
        #[arg(short, long)]
        revision: Option<String>,

        /// Rebuild the release even if it exists, without automatic recovery
        #[arg(short, long)]
        force: bool,

        /// Break an existing deploy lock
        #[arg(long)]
        break_lock: bool,
    },

    /// Roll back to a release, or one release back
    Rollback {
        /// Release to roll back to (overrides config)
        #[arg(short, long)]
        revision: Option<String>,

        /// Break an existing deploy lock
        #[arg(long)]
        break_lock: bool,
    },

    /// List releases and show which one is current
    Status,
}
