// ABOUTME: Release directory store: list, create, delete, and prune.
// ABOUTME: Ordering is the lexicographic order of release slugs.

use snafu::ResultExt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::observe::ReleaseObserver;
use crate::types::ReleaseSlug;

use super::copy::remove_path;
use super::error::{CreateDirSnafu, FsError, ReadDirSnafu};
use super::history::{Release, ReleaseHistory};

/// Name of the directory under the deploy root that holds releases.
pub const RELEASES_DIR: &str = "releases";

/// Default number of releases kept by retention.
pub const DEFAULT_KEEP_RELEASES: usize = 5;

/// Owns `{deploy_to}/releases`.
pub struct ReleaseStore {
    releases_dir: PathBuf,
    observer: Arc<dyn ReleaseObserver>,
}

impl std::fmt::Debug for ReleaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseStore")
            .field("releases_dir", &self.releases_dir)
            .finish()
    }
}

impl ReleaseStore {
    pub fn new(deploy_to: &Path, observer: Arc<dyn ReleaseObserver>) -> Self {
        Self {
            releases_dir: deploy_to.join(RELEASES_DIR),
            observer,
        }
    }

    pub fn releases_dir(&self) -> &Path {
        &self.releases_dir
    }

    /// The release a slug would occupy, whether or not it exists yet.
    pub fn release(&self, slug: ReleaseSlug) -> Release {
        Release::new(&self.releases_dir, slug)
    }

    /// List release directories, sorted ascending by slug.
    ///
    /// A missing `releases/` directory is an empty history. Entries that are
    /// not directories, or whose names are not valid slugs, are skipped.
    pub fn list(&self) -> Result<ReleaseHistory, FsError> {
        let entries = match fs::read_dir(&self.releases_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ReleaseHistory::default()),
            Err(e) => {
                return Err(e).context(ReadDirSnafu {
                    path: &self.releases_dir,
                });
            }
        };

        let mut releases = Vec::new();
        for entry in entries {
            let entry = entry.context(ReadDirSnafu {
                path: &self.releases_dir,
            })?;

            if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::debug!("Skipping non-UTF-8 entry in {}", self.releases_dir.display());
                continue;
            };

            match ReleaseSlug::new(name) {
                Ok(slug) => releases.push(self.release(slug)),
                Err(e) => tracing::debug!("Skipping {}: {}", name, e),
            }
        }

        Ok(ReleaseHistory::new(releases))
    }

    /// Prepare a new release location. Creates `releases/` but not the
    /// release directory itself; populating it is the pipeline's job.
    pub fn create(&self, slug: &ReleaseSlug) -> Result<Release, FsError> {
        fs::create_dir_all(&self.releases_dir).context(CreateDirSnafu {
            path: &self.releases_dir,
        })?;

        let release = self.release(slug.clone());
        self.observer.release_created(release.path());
        Ok(release)
    }

    /// Recursively delete a release directory. Deleting a missing path
    /// succeeds.
    pub fn delete(&self, path: &Path) -> Result<(), FsError> {
        tracing::debug!("Deleting release {}", path.display());
        remove_path(path)?;
        self.observer.release_deleted(path);
        Ok(())
    }

    /// Releases beyond the newest `keep`, oldest first.
    pub fn prune(history: &ReleaseHistory, keep: usize) -> Vec<Release> {
        let excess = history.len().saturating_sub(keep);
        history.as_slice()[..excess].to_vec()
    }
}
