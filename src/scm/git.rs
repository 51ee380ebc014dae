// ABOUTME: Source provider backed by a git repository.
// ABOUTME: Maintains a cached clone and checks out the requested revision.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::exec::{CommandExecutor, CommandOutput, CommandSpec, ExecError};
use crate::release::remove_path;

use super::{SourceError, SourceSync};

/// Revision checked out when none is configured.
pub const DEFAULT_GIT_REVISION: &str = "HEAD";

/// Clones and updates a git repository with the `git` CLI.
pub struct GitSource {
    repository: String,
    revision: String,
    working_copy: PathBuf,
    executor: Arc<dyn CommandExecutor>,
    env: HashMap<String, String>,
    user: Option<String>,
    group: Option<String>,
}

impl std::fmt::Debug for GitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitSource")
            .field("repository", &self.repository)
            .field("revision", &self.revision)
            .field("working_copy", &self.working_copy)
            .finish()
    }
}

impl GitSource {
    pub fn new(
        repository: impl Into<String>,
        working_copy: impl Into<PathBuf>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            repository: repository.into(),
            revision: DEFAULT_GIT_REVISION.to_string(),
            working_copy: working_copy.into(),
            executor,
            env: HashMap::new(),
            user: None,
            group: None,
        }
    }

    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn owner(mut self, user: Option<String>, group: Option<String>) -> Self {
        self.user = user;
        self.group = group;
        self
    }

    async fn git<I, S>(&self, cwd: Option<&Path>, args: I) -> Result<CommandOutput, SourceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec!["git".to_string()];
        argv.extend(args.into_iter().map(Into::into));

        let mut spec = CommandSpec::argv(argv)
            .envs(&self.env)
            .user(self.user.as_deref())
            .group(self.group.as_deref());
        if let Some(cwd) = cwd {
            spec = spec.cwd(cwd);
        }

        Ok(self.executor.run(&spec).await?)
    }

    async fn clone_into(&self, destination: &Path) -> Result<(), SourceError> {
        self.git(
            None,
            [
                "clone".to_string(),
                "--quiet".to_string(),
                self.repository.clone(),
                destination.display().to_string(),
            ],
        )
        .await?;
        Ok(())
    }

    /// Commit the configured revision names in the clone at `dir`.
    ///
    /// The remote-tracking ref is tried first, so `HEAD` and branch names
    /// follow what the last fetch brought in; tags and SHAs fall through to
    /// the plain name.
    async fn resolve_commit(&self, dir: &Path) -> Result<String, SourceError> {
        let candidates = [format!("origin/{}", self.revision), self.revision.clone()];

        for candidate in candidates {
            let output = self
                .git(
                    Some(dir),
                    [
                        "rev-parse".to_string(),
                        "--verify".to_string(),
                        "--quiet".to_string(),
                        format!("{candidate}^{{commit}}"),
                    ],
                )
                .await;

            match output {
                Ok(output) => {
                    let commit = output.stdout.trim();
                    if !commit.is_empty() {
                        tracing::debug!("Revision {} resolved to {}", candidate, commit);
                        return Ok(commit.to_string());
                    }
                }
                Err(SourceError::Command(ExecError::NonZeroExit { .. })) => {}
                Err(e) => return Err(e),
            }
        }

        Err(SourceError::UnknownRevision {
            repository: self.repository.clone(),
            revision: self.revision.clone(),
        })
    }

    async fn checkout(&self, destination: &Path) -> Result<(), SourceError> {
        let commit = self.resolve_commit(destination).await?;
        self.git(
            Some(destination),
            [
                "-c",
                "advice.detachedHead=false",
                "checkout",
                "--force",
                "--detach",
                commit.as_str(),
            ],
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SourceSync for GitSource {
    fn working_copy(&self) -> &Path {
        &self.working_copy
    }

    async fn sync(&self) -> Result<(), SourceError> {
        if self.working_copy.join(".git").exists() {
            tracing::info!("Fetching {} into {}", self.repository, self.working_copy.display());
            self.git(Some(&self.working_copy), ["fetch", "--quiet", "--prune", "origin"])
                .await?;
            self.git(Some(&self.working_copy), ["fetch", "--quiet", "--tags", "origin"])
                .await?;
        } else {
            // A forced export leaves a plain tree behind; git refuses to clone over it
            if self.working_copy.symlink_metadata().is_ok() {
                tracing::warn!(
                    "{} is not a git working copy, replacing it",
                    self.working_copy.display()
                );
                remove_path(&self.working_copy)?;
            }
            tracing::info!("Cloning {} into {}", self.repository, self.working_copy.display());
            self.clone_into(&self.working_copy).await?;
        }

        self.checkout(&self.working_copy).await
    }

    async fn force_export(&self, destination: &Path) -> Result<(), SourceError> {
        tracing::info!("Exporting {}@{} to {}", self.repository, self.revision, destination.display());
        remove_path(destination)?;
        self.clone_into(destination).await?;
        self.checkout(destination).await?;
        remove_path(&destination.join(".git"))?;
        Ok(())
    }
}
