// ABOUTME: Dependency installation step for new releases.
// ABOUTME: Runs an install command when the release declares a manifest.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::exec::{CommandExecutor, CommandSpec, ExecError, Ownership};

/// Installs a release's declared dependencies.
///
/// Must succeed without doing anything when the release has no manifest.
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    async fn install(&self, release_path: &Path) -> Result<(), ExecError>;
}

/// Installer for releases without dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependencies;

#[async_trait]
impl DependencyInstaller for NoDependencies {
    async fn install(&self, _release_path: &Path) -> Result<(), ExecError> {
        Ok(())
    }
}

/// Runs `command` inside the release when `manifest` exists there.
pub struct ManifestInstaller {
    manifest: PathBuf,
    command: String,
    executor: Arc<dyn CommandExecutor>,
    env: HashMap<String, String>,
    ownership: Ownership,
}

impl std::fmt::Debug for ManifestInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestInstaller")
            .field("manifest", &self.manifest)
            .field("command", &self.command)
            .finish()
    }
}

impl ManifestInstaller {
    pub fn new(
        manifest: impl Into<PathBuf>,
        command: impl Into<String>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            manifest: manifest.into(),
            command: command.into(),
            executor,
            env: HashMap::new(),
            ownership: Ownership::default(),
        }
    }

    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }
}

#[async_trait]
impl DependencyInstaller for ManifestInstaller {
    async fn install(&self, release_path: &Path) -> Result<(), ExecError> {
        let manifest = release_path.join(&self.manifest);
        if !manifest.is_file() {
            tracing::debug!("No {} in release, skipping install", self.manifest.display());
            return Ok(());
        }

        tracing::info!("Installing dependencies from {}", manifest.display());
        let spec = CommandSpec::shell(self.command.clone())
            .cwd(release_path)
            .envs(&self.env)
            .user(self.ownership.user.as_deref())
            .group(self.ownership.group.as_deref());
        self.executor.run(&spec).await?;
        Ok(())
    }
}
