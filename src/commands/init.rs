// ABOUTME: Init command implementation.
// ABOUTME: Scaffolds keel.yml in the working directory.

use keel::config;
use keel::error::Result;
use keel::output::Output;
use std::env;

pub fn init(
    deploy_to: Option<&str>,
    repository: Option<&str>,
    force: bool,
    output: Output,
) -> Result<()> {
    let cwd = env::current_dir()?;
    let path = config::init_config(&cwd, deploy_to, repository, force)?;
    output.success(&format!("Created {}", path.display()));
    Ok(())
}
