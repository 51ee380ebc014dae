// ABOUTME: Deploy lock to prevent concurrent actions on the same deploy root.
// ABOUTME: Lock info is staged then hard-linked into {deploy_to}/.keel.lock in one step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::DeployError;

/// Lock file name inside the deploy root.
pub const LOCK_FILE: &str = ".keel.lock";

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Locks older than this are broken automatically.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Deploy root the lock guards.
    pub deploy_to: PathBuf,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(deploy_to: &Path) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            deploy_to: deploy_to.to_path_buf(),
        }
    }

    /// Whether the lock is at least `stale_after` old.
    pub fn is_stale(&self, stale_after: Duration) -> bool {
        let age = Utc::now() - self.started_at;
        age.to_std().is_ok_and(|age| age >= stale_after)
    }

    /// Path to the lock file for a deploy root.
    pub fn lock_path(deploy_to: &Path) -> PathBuf {
        deploy_to.join(LOCK_FILE)
    }
}

/// A held deploy lock. Dropping it removes the lock file on a best-effort
/// basis; call [`release`](DeployLock::release) to observe failures.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
    released: bool,
}

impl DeployLock {
    /// Acquire the deploy lock for `deploy_to`.
    ///
    /// The lock info is written to a private staging file and hard-linked
    /// into place, so two processes cannot both succeed and nobody ever
    /// reads a half-written lock. An existing lock is broken with a warning when `force`
    /// is set, when it is older than `stale_after`, or when it cannot be
    /// parsed.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::LockHeld`] if another process holds a live
    /// lock, or [`DeployError::Lock`] if the lock file cannot be written.
    pub fn acquire(
        deploy_to: &Path,
        force: bool,
        stale_after: Duration,
    ) -> Result<Self, DeployError> {
        fs::create_dir_all(deploy_to).map_err(|e| {
            DeployError::lock_error(format!(
                "failed to create deploy root {}: {}",
                deploy_to.display(),
                e
            ))
        })?;

        let path = LockInfo::lock_path(deploy_to);
        let info = LockInfo::new(deploy_to);
        let json = serde_json::to_string(&info)
            .map_err(|e| DeployError::lock_error(format!("failed to serialize lock: {}", e)))?;

        match Self::try_create(&path, &json) {
            Ok(()) => return Ok(Self::held(path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(DeployError::lock_error(format!(
                    "failed to acquire lock {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        if let Some(existing) = Self::check_existing_lock(&path, force, stale_after) {
            return Err(DeployError::lock_held(
                existing.holder,
                existing.pid,
                existing.started_at,
            ));
        }

        tracing::debug!("Removing stale/forced lock at {}", path.display());
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DeployError::lock_error(format!(
                    "failed to break lock {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        match Self::try_create(&path, &json) {
            Ok(()) => Ok(Self::held(path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(DeployError::lock_error(
                "lock acquired by another process during break",
            )),
            Err(e) => Err(DeployError::lock_error(format!(
                "failed to acquire lock {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn held(path: PathBuf) -> Self {
        tracing::debug!("Acquired deploy lock {}", path.display());
        Self {
            path,
            released: false,
        }
    }

    fn try_create(path: &Path, json: &str) -> io::Result<()> {
        let staging = Self::staging_path(path);
        let written = Self::write_staging(&staging, json);
        let published = written.and_then(|()| fs::hard_link(&staging, path));
        let _ = fs::remove_file(&staging);
        published
    }

    fn write_staging(staging: &Path, json: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(staging)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()
    }

    fn staging_path(path: &Path) -> PathBuf {
        let n = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut name = path.as_os_str().to_os_string();
        name.push(format!(".{}.{}", std::process::id(), n));
        PathBuf::from(name)
    }

    /// Returns the holder when the existing lock is live and must be
    /// respected, or `None` when it may be broken.
    fn check_existing_lock(path: &Path, force: bool, stale_after: Duration) -> Option<LockInfo> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Lock info unreadable ({}), breaking lock", e);
                return None;
            }
        };

        match serde_json::from_str::<LockInfo>(&contents) {
            Ok(existing) if force => {
                tracing::warn!(
                    "Breaking lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                None
            }
            Ok(existing) if existing.is_stale(stale_after) => {
                tracing::warn!(
                    "Auto-breaking stale lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                None
            }
            Ok(existing) => Some(existing),
            Err(_) => {
                tracing::warn!("Lock info corrupted, breaking lock");
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Lock`] if the lock file cannot be removed.
    pub fn release(mut self) -> Result<(), DeployError> {
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DeployError::lock_error(format!(
                "failed to release lock {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_info_creates_with_current_host_and_pid() {
        let info = LockInfo::new(Path::new("/srv/app"));

        assert_eq!(info.deploy_to, PathBuf::from("/srv/app"));
        assert_eq!(info.pid, std::process::id());
        assert!(!info.holder.is_empty());
    }

    #[test]
    fn lock_path_is_inside_deploy_root() {
        assert_eq!(
            LockInfo::lock_path(Path::new("/srv/app")),
            PathBuf::from("/srv/app/.keel.lock")
        );
    }

    #[test]
    fn staging_paths_are_unique_siblings() {
        let lock = Path::new("/srv/app/.keel.lock");
        let first = DeployLock::staging_path(lock);
        let second = DeployLock::staging_path(lock);

        assert_ne!(first, second);
        assert_eq!(first.parent(), lock.parent());
        assert!(
            first
                .to_string_lossy()
                .starts_with("/srv/app/.keel.lock.")
        );
    }

    #[test]
    fn try_create_refuses_existing_lock_and_cleans_staging() {
        let root = tempfile::TempDir::new().unwrap();
        let path = LockInfo::lock_path(root.path());
        fs::write(&path, "held").unwrap();

        let err = DeployLock::try_create(&path, "{}").unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&path).unwrap(), "held");
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 1);
    }

    #[test]
    fn fresh_lock_is_not_stale() {
        let info = LockInfo::new(Path::new("/srv/app"));
        assert!(!info.is_stale(DEFAULT_STALE_AFTER));
    }

    #[test]
    fn old_lock_is_stale() {
        let mut info = LockInfo::new(Path::new("/srv/app"));
        info.started_at = Utc::now() - chrono::Duration::hours(2);
        assert!(info.is_stale(DEFAULT_STALE_AFTER));
        assert!(!info.is_stale(Duration::from_secs(3 * 60 * 60)));
    }
}
