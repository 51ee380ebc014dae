// ABOUTME: Top-level deploy, force deploy, and rollback actions.
// ABOUTME: Wires the descriptor and collaborators into the typestate pipeline.

use chrono::Utc;
use std::sync::Arc;

use crate::config::Config;
use crate::exec::{CommandExecutor, CommandSpec};
use crate::hooks::{CallbackResolver, HookEvaluator, HookScope, InterpreterHookEvaluator};
use crate::install::{DependencyInstaller, NoDependencies};
use crate::observe::{NoopObserver, ReleaseObserver};
use crate::release::{Release, ReleaseHistory, ReleaseStore};
use crate::scm::SourceSync;

use super::cutover::CutoverManager;
use super::deployment::Deployment;
use super::descriptor::{DeploymentDescriptor, RestartTarget};
use super::error::DeployError;
use super::rollback::RollbackPlan;

/// External capabilities the engine composes.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn SourceSync>,
    pub executor: Arc<dyn CommandExecutor>,
    pub installer: Arc<dyn DependencyInstaller>,
    pub hooks: Arc<dyn HookEvaluator>,
    pub observer: Arc<dyn ReleaseObserver>,
}

impl Collaborators {
    /// Collaborators with no dependency installer, the ruby hook
    /// evaluator, and no release observer.
    pub fn new(source: Arc<dyn SourceSync>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            hooks: Arc::new(InterpreterHookEvaluator::ruby(executor.clone())),
            installer: Arc::new(NoDependencies),
            observer: Arc::new(NoopObserver),
            source,
            executor,
        }
    }

    pub fn with_installer(mut self, installer: Arc<dyn DependencyInstaller>) -> Self {
        self.installer = installer;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn HookEvaluator>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReleaseObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// What a top-level action ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// The requested release was already current; nothing changed.
    AlreadyCurrent(Release),
    /// `current` moved back to `target`; `discarded` were deleted.
    RolledBack {
        target: Release,
        discarded: Vec<Release>,
    },
    /// A new release went through the full pipeline.
    Deployed {
        release: Release,
        pruned: Vec<Release>,
    },
}

/// Deploy engine for one deploy root.
///
/// Actions run to completion one step at a time. The engine does no locking;
/// callers that may race on the same deploy root take a
/// [`DeployLock`](super::DeployLock) first.
pub struct Engine {
    pub(crate) descriptor: DeploymentDescriptor,
    pub(crate) store: ReleaseStore,
    pub(crate) cutover: CutoverManager,
    pub(crate) callbacks: CallbackResolver,
    pub(crate) hook_scope: HookScope,
    pub(crate) source: Arc<dyn SourceSync>,
    pub(crate) installer: Arc<dyn DependencyInstaller>,
    pub(crate) executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("descriptor", &self.descriptor)
            .field("store", &self.store)
            .field("cutover", &self.cutover)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(descriptor: DeploymentDescriptor, collaborators: Collaborators) -> Self {
        let store = ReleaseStore::new(&descriptor.deploy_to, collaborators.observer);
        let cutover = CutoverManager::new(
            descriptor.deploy_to.clone(),
            descriptor.current_path.clone(),
            descriptor.ownership.clone(),
            collaborators.executor.clone(),
        );
        let hook_scope = descriptor.hook_scope();

        Self {
            store,
            cutover,
            callbacks: CallbackResolver::new(collaborators.hooks),
            hook_scope,
            source: collaborators.source,
            installer: collaborators.installer,
            executor: collaborators.executor,
            descriptor,
        }
    }

    /// Build an engine with the concrete collaborators a config names.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment value cannot be resolved or the
    /// config does not describe a usable source.
    pub fn from_config(
        config: &Config,
        executor: Arc<dyn CommandExecutor>,
    ) -> crate::error::Result<Self> {
        let descriptor = config.descriptor()?;
        let collaborators = config.collaborators(&descriptor, executor)?;
        Ok(Self::new(descriptor, collaborators))
    }

    pub fn descriptor(&self) -> &DeploymentDescriptor {
        &self.descriptor
    }

    /// Releases on disk, oldest first.
    pub fn releases(&self) -> Result<ReleaseHistory, DeployError> {
        Ok(self.store.list()?)
    }

    /// The release `current` resolves to, if any.
    pub fn current_release(&self) -> Result<Option<Release>, DeployError> {
        let history = self.store.list()?;
        Ok(self.cutover.resolve_current(&history)?)
    }

    /// Deploy the configured revision.
    ///
    /// An existing release is reused: no-op if it is already current,
    /// otherwise `current` is rolled back to it. A new release runs the full
    /// pipeline and is reverted on failure.
    ///
    /// # Errors
    ///
    /// Returns the pipeline error after recovery, or
    /// [`DeployError::RecoveryFailed`] if recovery also failed.
    pub async fn deploy(&self) -> Result<DeployOutcome, DeployError> {
        let slug = self.descriptor.release_slug(Utc::now())?;
        let history = self.store.list()?;
        let previous = self.cutover.resolve_current(&history)?;

        if let Some(existing) = history.get(&slug) {
            if previous.as_ref() == Some(existing) {
                tracing::info!("Release {} is already current, nothing to do", slug);
                return Ok(DeployOutcome::AlreadyCurrent(existing.clone()));
            }

            tracing::info!(
                "Release {} already exists, rolling back to it instead of redeploying",
                slug
            );
            let plan = RollbackPlan::explicit(&history, &slug)?;
            return self.execute_rollback(plan).await;
        }

        let release = self.store.create(&slug)?;
        let (release, pruned) = self.deploy_with_recovery(release, previous).await?;
        Ok(DeployOutcome::Deployed { release, pruned })
    }

    /// Deploy the configured revision from scratch, replacing any release
    /// with the same slug. Failures are not recovered.
    pub async fn force_deploy(&self) -> Result<DeployOutcome, DeployError> {
        let slug = self.descriptor.release_slug(Utc::now())?;
        let history = self.store.list()?;

        if let Some(existing) = history.get(&slug) {
            tracing::warn!("Force deploy: deleting existing release {}", slug);
            self.store.delete(existing.path())?;
        }

        let release = self.store.create(&slug)?;
        let (release, pruned) = self.run_pipeline(release).await?;
        Ok(DeployOutcome::Deployed { release, pruned })
    }

    /// Roll back to the configured revision, or one release back when no
    /// revision is configured.
    pub async fn rollback(&self) -> Result<DeployOutcome, DeployError> {
        let history = self.store.list()?;
        let plan = match self.descriptor.requested_slug()? {
            Some(slug) => RollbackPlan::explicit(&history, &slug)?,
            None => RollbackPlan::implicit(&history)?,
        };
        self.execute_rollback(plan).await
    }

    /// Run every pipeline step against `release`, without recovery.
    pub async fn run_pipeline(
        &self,
        release: Release,
    ) -> Result<(Release, Vec<Release>), DeployError> {
        tracing::info!("Deploying release {}", release.slug());

        let completed = Deployment::new(release)
            .materialize(self)
            .await?
            .install_dependencies(self)
            .await?
            .migrate(self)
            .await?
            .symlink(self)
            .await?
            .restart(self)
            .await?
            .cleanup(self)?;

        Ok(completed.finish())
    }

    pub(crate) async fn enforce_ownership(&self) -> Result<(), DeployError> {
        self.descriptor
            .ownership
            .enforce(self.executor.as_ref(), &self.descriptor.deploy_to)
            .await?;
        Ok(())
    }

    /// Run the configured restart target for `release`.
    pub(crate) async fn restart(&self, release: &Release) -> Result<(), DeployError> {
        match &self.descriptor.restart {
            None => {
                tracing::debug!("No restart target configured");
            }
            Some(RestartTarget::Command(line)) => {
                tracing::info!("Restarting: {}", line);
                let spec = CommandSpec::shell(line.clone())
                    .cwd(&self.descriptor.current_path)
                    .envs(&self.descriptor.environment)
                    .user(self.descriptor.ownership.user.as_deref())
                    .group(self.descriptor.ownership.group.as_deref());
                self.executor.run(&spec).await?;
            }
            Some(RestartTarget::Script(embedded)) => {
                tracing::info!("Restarting with embedded script");
                self.callbacks
                    .run_script("restart", &embedded.script, release.path(), &self.hook_scope)
                    .await?;
            }
        }
        Ok(())
    }

    /// Delete releases beyond retention. The release `current` resolves to
    /// is never deleted.
    pub(crate) fn prune_releases(&self) -> Result<Vec<Release>, DeployError> {
        let history = self.store.list()?;
        let current = self.cutover.resolve_current(&history)?;

        let mut pruned = Vec::new();
        for release in ReleaseStore::prune(&history, self.descriptor.keep_releases) {
            if current.as_ref() == Some(&release) {
                tracing::warn!(
                    "Not pruning {}: it is the current release",
                    release.slug()
                );
                continue;
            }
            self.store.delete(release.path())?;
            pruned.push(release);
        }

        if !pruned.is_empty() {
            tracing::info!(
                "Pruned {} release(s) beyond retention of {}",
                pruned.len(),
                self.descriptor.keep_releases
            );
        }
        Ok(pruned)
    }
}
