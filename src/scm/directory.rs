// ABOUTME: Source provider backed by a local directory.
// ABOUTME: Mirrors a build output directory into the working copy.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::release::{copy_dir_recursive, mirror_dir, remove_path};

use super::{SourceError, SourceSync};

/// Uses an already-built directory on the same host as the source.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    source: PathBuf,
    working_copy: PathBuf,
}

impl DirectorySource {
    pub fn new(source: impl Into<PathBuf>, working_copy: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            working_copy: working_copy.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[async_trait]
impl SourceSync for DirectorySource {
    fn working_copy(&self) -> &Path {
        &self.working_copy
    }

    async fn sync(&self) -> Result<(), SourceError> {
        tracing::info!(
            "Syncing {} into {}",
            self.source.display(),
            self.working_copy.display()
        );
        mirror_dir(&self.source, &self.working_copy)?;
        Ok(())
    }

    async fn force_export(&self, destination: &Path) -> Result<(), SourceError> {
        tracing::info!(
            "Exporting {} to {}",
            self.source.display(),
            destination.display()
        );
        remove_path(destination)?;
        copy_dir_recursive(&self.source, destination)?;
        Ok(())
    }
}
