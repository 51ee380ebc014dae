// ABOUTME: Filesystem error types with SNAFU context selectors.
// ABOUTME: Every variant records the path involved and the I/O source.

use snafu::Snafu;
use std::io;
use std::path::PathBuf;

/// Failure of a filesystem primitive (copy, link, remove, rename).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FsError {
    #[snafu(display("failed to read directory {}: {source}", path.display()))]
    ReadDir { path: PathBuf, source: io::Error },

    #[snafu(display("failed to walk {}: {source}", path.display()))]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[snafu(display("{} is not under {}", path.display(), root.display()))]
    OutsideRoot {
        path: PathBuf,
        root: PathBuf,
        source: std::path::StripPrefixError,
    },

    #[snafu(display("failed to read metadata of {}: {source}", path.display()))]
    Metadata { path: PathBuf, source: io::Error },

    #[snafu(display("failed to create directory {}: {source}", path.display()))]
    CreateDir { path: PathBuf, source: io::Error },

    #[snafu(display("failed to remove {}: {source}", path.display()))]
    Remove { path: PathBuf, source: io::Error },

    #[snafu(display("failed to copy {} to {}: {source}", from.display(), to.display()))]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[snafu(display("failed to link {} -> {}: {source}", link.display(), target.display()))]
    Symlink {
        link: PathBuf,
        target: PathBuf,
        source: io::Error,
    },

    #[snafu(display("failed to read link {}: {source}", path.display()))]
    ReadLink { path: PathBuf, source: io::Error },

    #[snafu(display("failed to rename {} to {}: {source}", from.display(), to.display()))]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

impl FsError {
    /// The path the failed operation was acting on.
    pub fn path(&self) -> &std::path::Path {
        match self {
            FsError::ReadDir { path, .. }
            | FsError::Walk { path, .. }
            | FsError::OutsideRoot { path, .. }
            | FsError::Metadata { path, .. }
            | FsError::CreateDir { path, .. }
            | FsError::Remove { path, .. }
            | FsError::ReadLink { path, .. } => path,
            FsError::Copy { to, .. } | FsError::Rename { to, .. } => to,
            FsError::Symlink { link, .. } => link,
        }
    }
}
