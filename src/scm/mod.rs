// ABOUTME: Source synchronization capability used by the deploy pipeline.
// ABOUTME: Exports the SourceSync trait and the git and directory providers.

mod directory;
mod git;

pub use directory::DirectorySource;
pub use git::GitSource;

use async_trait::async_trait;
use std::path::Path;

use crate::exec::ExecError;
use crate::release::FsError;

/// Errors from synchronizing or exporting source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source command failed: {0}")]
    Command(#[from] ExecError),

    #[error("source filesystem error: {0}")]
    Filesystem(#[from] FsError),

    #[error("revision {revision} not found in {repository}")]
    UnknownRevision { repository: String, revision: String },
}

/// Keeps a working copy of the artifact at the requested revision.
///
/// The pipeline calls exactly one of [`sync`](SourceSync::sync) or
/// [`force_export`](SourceSync::force_export) per deploy, then copies
/// [`working_copy`](SourceSync::working_copy) into the new release.
#[async_trait]
pub trait SourceSync: Send + Sync {
    /// Directory the pipeline copies releases from.
    fn working_copy(&self) -> &Path;

    /// Bring the long-lived working copy up to date.
    async fn sync(&self) -> Result<(), SourceError>;

    /// Materialize a clean copy of the revision at `destination`.
    async fn force_export(&self, destination: &Path) -> Result<(), SourceError>;
}
