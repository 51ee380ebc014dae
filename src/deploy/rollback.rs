// ABOUTME: Rollback planning and execution.
// ABOUTME: Picks the release to restore and the newer releases to discard.

use crate::release::{Release, ReleaseHistory};
use crate::types::ReleaseSlug;

use super::engine::{DeployOutcome, Engine};
use super::error::DeployError;

/// Which release becomes current and which releases are deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackPlan {
    pub target: Release,
    /// Releases newer than the target, oldest first.
    pub discarded: Vec<Release>,
}

impl RollbackPlan {
    /// Roll back to `slug`, discarding every newer release.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::NoSuchRelease`] if `slug` is not on disk.
    pub fn explicit(history: &ReleaseHistory, slug: &ReleaseSlug) -> Result<Self, DeployError> {
        let index = history
            .position(slug)
            .ok_or_else(|| DeployError::NoSuchRelease(slug.to_string()))?;
        let releases = history.as_slice();

        Ok(Self {
            target: releases[index].clone(),
            discarded: releases[index + 1..].to_vec(),
        })
    }

    /// Roll back one release, discarding only the newest.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::NoRollbackTarget`] with fewer than two
    /// releases on disk.
    pub fn implicit(history: &ReleaseHistory) -> Result<Self, DeployError> {
        match history.as_slice() {
            [.., target, newest] => Ok(Self {
                target: target.clone(),
                discarded: vec![newest.clone()],
            }),
            _ => Err(DeployError::NoRollbackTarget {
                found: history.len(),
            }),
        }
    }
}

impl Engine {
    /// Cut over to the plan's target, restart it, then delete the discarded
    /// releases. Migrations, dependency install, and the migrate/symlink
    /// hooks are not re-run.
    pub async fn execute_rollback(&self, plan: RollbackPlan) -> Result<DeployOutcome, DeployError> {
        tracing::info!(
            "Rolling back to {} ({} release(s) discarded)",
            plan.target.slug(),
            plan.discarded.len()
        );

        self.cutover.cutover(&plan.target).await?;
        self.restart(&plan.target).await?;

        for release in &plan.discarded {
            self.store.delete(release.path())?;
        }

        Ok(DeployOutcome::RolledBack {
            target: plan.target,
            discarded: plan.discarded,
        })
    }
}
