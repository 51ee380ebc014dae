// ABOUTME: Deploy command implementation.
// ABOUTME: Runs deploy or force deploy under the deploy lock and reports the outcome.

use keel::deploy::{DeployOutcome, Engine};
use keel::diagnostics::Diagnostics;
use keel::error::Result;
use keel::exec::ProcessExecutor;
use keel::output::Output;
use std::path::Path;
use std::sync::Arc;

use super::{load_config, with_lock};

pub async fn deploy(
    config_path: Option<&Path>,
    revision: Option<String>,
    force: bool,
    break_lock: bool,
    mut output: Output,
) -> Result<()> {
    let config = load_config(config_path, revision)?;
    let engine = Engine::from_config(&config, Arc::new(ProcessExecutor))?;
    let mut diag = Diagnostics::default();

    output.start_timer();
    output.progress(&format!(
        "Deploying {} to {}",
        config.revision.as_deref().unwrap_or("latest source"),
        config.deploy_to.display()
    ));

    let outcome = with_lock(&config, break_lock, &mut diag, async {
        if force {
            engine.force_deploy().await
        } else {
            engine.deploy().await
        }
    })
    .await?;

    let message = match &outcome {
        DeployOutcome::AlreadyCurrent(release) => {
            format!("Release {} is already current", release.slug())
        }
        DeployOutcome::RolledBack { target, discarded } => {
            for release in discarded {
                output.removed(release.slug().as_str());
            }
            format!("Release {} already existed; rolled back to it", target.slug())
        }
        DeployOutcome::Deployed { release, pruned } => {
            for old in pruned {
                output.removed(old.slug().as_str());
            }
            format!("Deployed release {}", release.slug())
        }
    };

    diag.check_retention(engine.releases()?.len(), config.keep_releases);
    diag.report(&output);

    output.success(&message);
    Ok(())
}
