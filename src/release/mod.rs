// ABOUTME: Release directories and their on-disk ordering.
// ABOUTME: Exports the release store, history types, copy helpers, and fs errors.

mod copy;
mod error;
mod history;
mod store;

pub use copy::{copy_dir_recursive, mirror_dir, remove_path};
pub use error::FsError;
pub use history::{Release, ReleaseHistory};
pub use store::{DEFAULT_KEEP_RELEASES, RELEASES_DIR, ReleaseStore};

pub(crate) use error::{CreateDirSnafu, ReadLinkSnafu, RenameSnafu, SymlinkSnafu};
