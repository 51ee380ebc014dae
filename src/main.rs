// ABOUTME: Entry point for the keel CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use keel::error::Result;
use keel::output::Output;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.output_mode());
    let error_output = Output::new(cli.output_mode());

    if let Err(e) = run(cli, output).await {
        error_output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Init {
            deploy_to,
            repository,
            force,
        } => commands::init(deploy_to.as_deref(), repository.as_deref(), force, output),
        Commands::Deploy {
            revision,
            force,
            break_lock,
        } => commands::deploy(config, revision, force, break_lock, output).await,
        Commands::Rollback {
            revision,
            break_lock,
        } => commands::rollback(config, revision, break_lock, output).await,
        Commands::Status => commands::status(config, output),
    }
}
