// ABOUTME: State transition methods for the deploy pipeline.
// ABOUTME: Each method consumes self and returns the next phase on success.

use snafu::ResultExt;
use std::fs;

use crate::exec::CommandSpec;
use crate::release::{CreateDirSnafu, copy_dir_recursive};
use crate::types::HookName;

use super::Deployment;
use super::engine::Engine;
use super::error::DeployError;
use super::state::{Completed, CutOver, Initialized, Installed, Materialized, Migrated, Restarted};

impl<S> Deployment<S> {
    fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            release: self.release,
            state,
        }
    }

    async fn run_hook(&self, engine: &Engine, what: HookName) -> Result<(), DeployError> {
        tracing::debug!("Hook {} for {}", what, self.release.slug());
        engine
            .callbacks
            .run(
                what,
                engine.descriptor.hooks.get(what),
                self.release.path(),
                &engine.hook_scope,
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// Initialized -> Materialized
// =============================================================================

impl Deployment<Initialized> {
    /// Sync the source and copy it into the release directory.
    ///
    /// # Errors
    ///
    /// Returns an error if ownership, source sync, or the copy fails.
    #[must_use = "deployment state must be used"]
    pub async fn materialize(self, engine: &Engine) -> Result<Deployment<Materialized>, DeployError> {
        let descriptor = &engine.descriptor;
        for dir in [&descriptor.deploy_to, &descriptor.shared_path] {
            fs::create_dir_all(dir).context(CreateDirSnafu { path: dir })?;
        }
        engine.enforce_ownership().await?;

        let working_copy = engine.source.working_copy();
        if descriptor.force_export {
            tracing::info!("Exporting source to {}", working_copy.display());
            engine.source.force_export(working_copy).await?;
        } else {
            tracing::info!("Syncing source in {}", working_copy.display());
            engine.source.sync().await?;
        }

        tracing::info!("Copying {} to {}", working_copy.display(), self.release.path().display());
        copy_dir_recursive(working_copy, self.release.path())?;

        Ok(self.transition(Materialized))
    }
}

// =============================================================================
// Materialized -> Installed
// =============================================================================

impl Deployment<Materialized> {
    /// Install declared dependencies, then re-enforce ownership.
    #[must_use = "deployment state must be used"]
    pub async fn install_dependencies(
        self,
        engine: &Engine,
    ) -> Result<Deployment<Installed>, DeployError> {
        engine.installer.install(self.release.path()).await?;
        engine.enforce_ownership().await?;
        Ok(self.transition(Installed))
    }
}

// =============================================================================
// Installed -> Migrated
// =============================================================================

impl Deployment<Installed> {
    /// Run `before_migrate`, link the pre-migrate shared paths, and run
    /// migrations when enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the hook, the links, or the migration command
    /// fails.
    #[must_use = "deployment state must be used"]
    pub async fn migrate(self, engine: &Engine) -> Result<Deployment<Migrated>, DeployError> {
        let descriptor = &engine.descriptor;
        self.run_hook(engine, HookName::BeforeMigrate).await?;

        engine.cutover.link_shared(
            &self.release,
            &descriptor.shared_path,
            &descriptor.symlink_before_migrate,
        )?;

        if descriptor.migrate {
            match &descriptor.migration_command {
                Some(line) => {
                    engine.enforce_ownership().await?;
                    tracing::info!("Running migrations: {}", line);
                    let spec = CommandSpec::shell(line.clone())
                        .cwd(self.release.path())
                        .envs(&descriptor.environment)
                        .user(descriptor.ownership.user.as_deref())
                        .group(descriptor.ownership.group.as_deref());
                    engine.executor.run(&spec).await?;
                }
                None => tracing::warn!("Migrations enabled but no migration command set"),
            }
        }

        Ok(self.transition(Migrated))
    }
}

// =============================================================================
// Migrated -> CutOver
// =============================================================================

impl Deployment<Migrated> {
    /// Run `before_symlink`, build the shared-path links, and cut `current`
    /// over to the release.
    #[must_use = "deployment state must be used"]
    pub async fn symlink(self, engine: &Engine) -> Result<Deployment<CutOver>, DeployError> {
        let descriptor = &engine.descriptor;
        self.run_hook(engine, HookName::BeforeSymlink).await?;

        let cutover = &engine.cutover;
        cutover.purge(&self.release, &descriptor.purge_before_symlink)?;
        cutover.create_dirs(&self.release, &descriptor.create_dirs_before_symlink)?;
        cutover.link_shared(&self.release, &descriptor.shared_path, &descriptor.symlinks)?;
        cutover.link_shared(
            &self.release,
            &descriptor.shared_path,
            &descriptor.symlink_before_migrate,
        )?;
        engine.enforce_ownership().await?;

        cutover.cutover(&self.release).await?;
        Ok(self.transition(CutOver))
    }
}

// =============================================================================
// CutOver -> Restarted
// =============================================================================

impl Deployment<CutOver> {
    /// Run `before_restart`, the restart target, and `after_restart`.
    #[must_use = "deployment state must be used"]
    pub async fn restart(self, engine: &Engine) -> Result<Deployment<Restarted>, DeployError> {
        self.run_hook(engine, HookName::BeforeRestart).await?;
        engine.restart(&self.release).await?;
        self.run_hook(engine, HookName::AfterRestart).await?;
        Ok(self.transition(Restarted))
    }
}

// =============================================================================
// Restarted -> Completed
// =============================================================================

impl Deployment<Restarted> {
    /// Delete releases beyond retention.
    #[must_use = "deployment state must be used"]
    pub fn cleanup(self, engine: &Engine) -> Result<Deployment<Completed>, DeployError> {
        let pruned = engine.prune_releases()?;
        Ok(self.transition(Completed { pruned }))
    }
}
