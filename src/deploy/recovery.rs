// ABOUTME: Failure recovery around a full deploy attempt.
// ABOUTME: Restores the previous release and deletes the failed one before re-raising.

use crate::release::Release;

use super::engine::Engine;
use super::error::DeployError;

impl Engine {
    /// Run the pipeline for `release`. On failure, put `previous` back in
    /// place, delete `release`, and return the pipeline error.
    ///
    /// `previous` is what `current` resolved to before the attempt started.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's error unchanged when recovery succeeds, or
    /// [`DeployError::RecoveryFailed`] carrying both errors when it does not.
    pub async fn deploy_with_recovery(
        &self,
        release: Release,
        previous: Option<Release>,
    ) -> Result<(Release, Vec<Release>), DeployError> {
        match self.run_pipeline(release.clone()).await {
            Ok(done) => Ok(done),
            Err(original) => {
                tracing::warn!("Deploy of {} failed: {}", release.slug(), original);
                match self.recover(&release, previous.as_ref()).await {
                    Ok(()) => Err(original),
                    Err(recovery) => {
                        tracing::error!("Recovery after failed deploy also failed: {}", recovery);
                        Err(DeployError::RecoveryFailed {
                            original: Box::new(original),
                            recovery: Box::new(recovery),
                        })
                    }
                }
            }
        }
    }

    async fn recover(&self, failed: &Release, previous: Option<&Release>) -> Result<(), DeployError> {
        match previous {
            Some(previous) => {
                // Retention may already have removed it. Leave the new
                // release live rather than point `current` at nothing.
                if !previous.path().is_dir() {
                    tracing::error!(
                        "Previous release {} is gone, keeping {} in place",
                        previous.slug(),
                        failed.slug()
                    );
                    return Err(DeployError::NoSuchRelease(previous.slug().to_string()));
                }
                tracing::info!("Restoring previous release {}", previous.slug());
                self.cutover.cutover(previous).await?;
                self.restart(previous).await?;
            }
            None => {
                if self.cutover.points_at(failed)? {
                    self.cutover.remove_current()?;
                }
            }
        }

        tracing::info!("Deleting failed release {}", failed.slug());
        self.store.delete(failed.path())?;
        Ok(())
    }
}
