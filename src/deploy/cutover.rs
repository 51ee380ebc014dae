// ABOUTME: Shared-path symlink farm and the atomic current pointer swap.
// ABOUTME: The only component that writes the current symlink.

use snafu::ResultExt;
use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::exec::{CommandExecutor, Ownership};
use crate::release::{
    CreateDirSnafu, FsError, ReadLinkSnafu, Release, ReleaseHistory, RenameSnafu, SymlinkSnafu,
    remove_path,
};

use super::descriptor::LinkMap;
use super::error::DeployError;

/// Manages links into releases and the `current` symlink.
pub struct CutoverManager {
    deploy_to: PathBuf,
    current_path: PathBuf,
    ownership: Ownership,
    executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for CutoverManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CutoverManager")
            .field("deploy_to", &self.deploy_to)
            .field("current_path", &self.current_path)
            .field("ownership", &self.ownership)
            .finish()
    }
}

impl CutoverManager {
    pub fn new(
        deploy_to: impl Into<PathBuf>,
        current_path: impl Into<PathBuf>,
        ownership: Ownership,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            deploy_to: deploy_to.into(),
            current_path: current_path.into(),
            ownership,
            executor,
        }
    }

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    /// Remove release-relative directories that shared links will replace.
    pub fn purge(&self, release: &Release, dirs: &[PathBuf]) -> Result<(), FsError> {
        for dir in dirs {
            let path = release.path().join(dir);
            tracing::debug!("Purging {}", path.display());
            remove_path(&path)?;
        }
        Ok(())
    }

    /// Create release-relative directories ahead of linking.
    pub fn create_dirs(&self, release: &Release, dirs: &[PathBuf]) -> Result<(), FsError> {
        for dir in dirs {
            let path = release.path().join(dir);
            fs::create_dir_all(&path).context(CreateDirSnafu { path: &path })?;
        }
        Ok(())
    }

    /// Link `{shared_path}/{source}` at `{release}/{dest}` for each entry,
    /// replacing whatever is at the destination.
    pub fn link_shared(
        &self,
        release: &Release,
        shared_path: &Path,
        mapping: &LinkMap,
    ) -> Result<(), FsError> {
        for (source, dest) in mapping.iter() {
            let target = shared_path.join(source);
            let link = release.path().join(dest);

            if let Some(parent) = link.parent() {
                fs::create_dir_all(parent).context(CreateDirSnafu { path: parent })?;
            }
            remove_path(&link)?;

            tracing::debug!("Linking {} -> {}", link.display(), target.display());
            symlink(&target, &link).context(SymlinkSnafu {
                link: &link,
                target: &target,
            })?;
        }
        Ok(())
    }

    /// Point `current` at `release`.
    ///
    /// The new link is written under a temporary name next to `current` and
    /// renamed over it, so readers see either the old or the new target.
    pub async fn cutover(&self, release: &Release) -> Result<(), DeployError> {
        let parent = self
            .current_path
            .parent()
            .unwrap_or_else(|| Path::new("/"));
        fs::create_dir_all(parent).context(CreateDirSnafu { path: parent })?;

        let staging = self.staging_path();
        remove_path(&staging)?;
        symlink(release.path(), &staging).context(SymlinkSnafu {
            link: &staging,
            target: release.path(),
        })?;

        if let Err(e) = fs::rename(&staging, &self.current_path) {
            let _ = remove_path(&staging);
            return Err(e)
                .context(RenameSnafu {
                    from: &staging,
                    to: &self.current_path,
                })
                .map_err(DeployError::from);
        }

        tracing::info!(
            "Cut over {} -> {}",
            self.current_path.display(),
            release.path().display()
        );

        self.ownership
            .enforce(self.executor.as_ref(), &self.deploy_to)
            .await?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let name = self
            .current_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "current".to_string());
        self.current_path
            .with_file_name(format!(".{name}.keel-{}", std::process::id()))
    }

    /// Where `current` points, made absolute. `None` when `current` is
    /// missing or is not a symlink.
    pub fn current_target(&self) -> Result<Option<PathBuf>, FsError> {
        match fs::symlink_metadata(&self.current_path) {
            Ok(m) if m.file_type().is_symlink() => {}
            Ok(_) => {
                tracing::warn!(
                    "{} exists but is not a symlink",
                    self.current_path.display()
                );
                return Ok(None);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).context(ReadLinkSnafu {
                    path: &self.current_path,
                });
            }
        }

        let target = fs::read_link(&self.current_path).context(ReadLinkSnafu {
            path: &self.current_path,
        })?;

        if target.is_absolute() {
            return Ok(Some(target));
        }

        let base = self.current_path.parent().unwrap_or_else(|| Path::new("/"));
        Ok(Some(base.join(target)))
    }

    /// The release in `history` that `current` resolves to.
    pub fn resolve_current(&self, history: &ReleaseHistory) -> Result<Option<Release>, FsError> {
        let Some(target) = self.current_target()? else {
            return Ok(None);
        };

        if let Some(release) = history.iter().find(|r| r.path() == target) {
            return Ok(Some(release.clone()));
        }

        // Fall back to comparing canonical paths (symlinked deploy roots)
        let Ok(canonical) = fs::canonicalize(&target) else {
            return Ok(None);
        };
        Ok(history
            .iter()
            .find(|r| fs::canonicalize(r.path()).is_ok_and(|p| p == canonical))
            .cloned())
    }

    /// Whether `current` resolves to `release`.
    pub fn points_at(&self, release: &Release) -> Result<bool, FsError> {
        Ok(self.resolve_current(&ReleaseHistory::new(vec![release.clone()]))?
            .is_some())
    }

    /// Remove the `current` symlink.
    pub fn remove_current(&self) -> Result<(), FsError> {
        tracing::info!("Removing {}", self.current_path.display());
        remove_path(&self.current_path)
    }
}
