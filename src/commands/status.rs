// ABOUTME: Status command implementation.
// ABOUTME: Lists releases oldest first and marks the current one.

use keel::deploy::Engine;
use keel::error::Result;
use keel::exec::ProcessExecutor;
use keel::output::Output;
use std::path::Path;
use std::sync::Arc;

use super::load_config;

pub fn status(config_path: Option<&Path>, output: Output) -> Result<()> {
    let config = load_config(config_path, None)?;
    let engine = Engine::from_config(&config, Arc::new(ProcessExecutor))?;

    let releases = engine.releases()?;
    let current = engine.current_release()?;

    if releases.is_empty() {
        output.info(&format!("No releases in {}", config.deploy_to.display()));
        return Ok(());
    }

    for release in &releases {
        let is_current = current.as_ref() == Some(release);
        output.release(release.slug().as_str(), is_current);
    }

    if current.is_none() {
        output.info("No current release");
    }
    Ok(())
}
