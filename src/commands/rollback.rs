// ABOUTME: Rollback command implementation.
// ABOUTME: Moves current back to an earlier release and deletes the newer ones.

use keel::deploy::{DeployOutcome, Engine};
use keel::diagnostics::Diagnostics;
use keel::error::Result;
use keel::exec::ProcessExecutor;
use keel::output::Output;
use std::path::Path;
use std::sync::Arc;

use super::{load_config, with_lock};

pub async fn rollback(
    config_path: Option<&Path>,
    revision: Option<String>,
    break_lock: bool,
    mut output: Output,
) -> Result<()> {
    let config = load_config(config_path, revision)?;
    let engine = Engine::from_config(&config, Arc::new(ProcessExecutor))?;
    let mut diag = Diagnostics::default();

    output.start_timer();
    output.progress(&format!("Rolling back {}", config.deploy_to.display()));

    let outcome = with_lock(&config, break_lock, &mut diag, engine.rollback()).await?;

    diag.report(&output);

    if let DeployOutcome::RolledBack { target, discarded } = outcome {
        for release in &discarded {
            output.removed(release.slug().as_str());
        }
        output.success(&format!("Rolled back to {}", target.slug()));
    }
    Ok(())
}
