// ABOUTME: Error types for deploy, rollback, and recovery operations.
// ABOUTME: Each error maps to a DeployErrorKind for programmatic handling.

use chrono::{DateTime, Utc};

use crate::exec::ExecError;
use crate::hooks::HookError;
use crate::release::FsError;
use crate::scm::SourceError;
use crate::types::ReleaseSlugError;

/// Errors raised by deploy actions and pipeline steps.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Explicit rollback target is not on disk.
    #[error("no such release: {0}")]
    NoSuchRelease(String),

    /// Implicit rollback needs at least two releases.
    #[error("no release to roll back to ({found} release(s) on disk)")]
    NoRollbackTarget { found: usize },

    /// Hook resolution or execution failed.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// A command (migration, restart, ownership, install) failed.
    #[error("command failed: {0}")]
    Command(#[from] ExecError),

    /// Source sync or export failed.
    #[error("source sync failed: {0}")]
    Source(#[from] SourceError),

    /// Copy, link, rename, or removal failed.
    #[error(transparent)]
    Filesystem(#[from] FsError),

    /// The requested revision does not yield a usable release slug.
    #[error("invalid release slug: {0}")]
    InvalidSlug(#[from] ReleaseSlugError),

    /// Deploy lock could not be acquired or released.
    #[error("deploy lock error: {0}")]
    Lock(String),

    /// Another process holds the deploy lock.
    #[error("deploy lock held by {} (pid {}) since {}", .0.holder, .0.pid, .0.started_at)]
    LockHeld(Box<LockHolderInfo>),

    /// The deploy failed and restoring the previous release failed too.
    /// The deploy root needs manual attention.
    #[error("{original}; recovery also failed: {recovery}")]
    RecoveryFailed {
        original: Box<DeployError>,
        recovery: Box<DeployError>,
    },
}

/// Who holds a deploy lock.
#[derive(Debug, Clone)]
pub struct LockHolderInfo {
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

/// Error category for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    NoSuchRelease,
    NoRollbackTarget,
    HookNotFound,
    InvalidHookSpecification,
    HookExecutionError,
    CommandFailed,
    FilesystemError,
    InvalidSlug,
    Lock,
    LockHeld,
    RecoveryFailed,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::NoSuchRelease(_) => DeployErrorKind::NoSuchRelease,
            DeployError::NoRollbackTarget { .. } => DeployErrorKind::NoRollbackTarget,
            DeployError::Hook(HookError::NotFound { .. }) => DeployErrorKind::HookNotFound,
            DeployError::Hook(HookError::InvalidSpecification { .. }) => {
                DeployErrorKind::InvalidHookSpecification
            }
            DeployError::Hook(HookError::Failed { .. }) => DeployErrorKind::HookExecutionError,
            DeployError::Command(_)
            | DeployError::Source(SourceError::Command(_) | SourceError::UnknownRevision { .. }) => {
                DeployErrorKind::CommandFailed
            }
            DeployError::Filesystem(_) | DeployError::Source(SourceError::Filesystem(_)) => {
                DeployErrorKind::FilesystemError
            }
            DeployError::InvalidSlug(_) => DeployErrorKind::InvalidSlug,
            DeployError::Lock(_) => DeployErrorKind::Lock,
            DeployError::LockHeld(_) => DeployErrorKind::LockHeld,
            DeployError::RecoveryFailed { .. } => DeployErrorKind::RecoveryFailed,
        }
    }

    pub(crate) fn lock_error(message: impl Into<String>) -> Self {
        DeployError::Lock(message.into())
    }

    pub(crate) fn lock_held(holder: String, pid: u32, started_at: DateTime<Utc>) -> Self {
        DeployError::LockHeld(Box::new(LockHolderInfo {
            holder,
            pid,
            started_at,
        }))
    }

    /// Lock holder details, if this is a lock-held error.
    pub fn lock_holder_info(&self) -> Option<&LockHolderInfo> {
        match self {
            DeployError::LockHeld(info) => Some(info),
            _ => None,
        }
    }
}
