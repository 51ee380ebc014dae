// ABOUTME: Integration tests for the per-deploy-root lock file.
// ABOUTME: Covers exclusive acquisition, stale and corrupted locks, and forced breaks.

use keel::deploy::{DEFAULT_STALE_AFTER, DeployErrorKind, DeployLock, LockInfo};
use std::fs;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn second_acquire_reports_holder() {
    let root = TempDir::new().unwrap();
    let _held = DeployLock::acquire(root.path(), false, DEFAULT_STALE_AFTER).unwrap();

    let err = DeployLock::acquire(root.path(), false, DEFAULT_STALE_AFTER).unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::LockHeld);
    let holder = err.lock_holder_info().unwrap();
    assert_eq!(holder.pid, std::process::id());
}

#[test]
fn release_removes_lock_file() {
    let root = TempDir::new().unwrap();
    let lock = DeployLock::acquire(root.path(), false, DEFAULT_STALE_AFTER).unwrap();
    let path = lock.path().to_path_buf();
    assert!(path.exists());

    lock.release().unwrap();
    assert!(!path.exists());

    DeployLock::acquire(root.path(), false, DEFAULT_STALE_AFTER).unwrap();
}

#[test]
fn dropping_lock_releases_it() {
    let root = TempDir::new().unwrap();
    {
        let _lock = DeployLock::acquire(root.path(), false, DEFAULT_STALE_AFTER).unwrap();
    }
    assert!(!LockInfo::lock_path(root.path()).exists());
}

#[test]
fn force_breaks_live_lock() {
    let root = TempDir::new().unwrap();
    let held = DeployLock::acquire(root.path(), false, DEFAULT_STALE_AFTER).unwrap();

    let forced = DeployLock::acquire(root.path(), true, DEFAULT_STALE_AFTER).unwrap();
    assert!(forced.path().exists());
    std::mem::forget(held);
}

#[test]
fn stale_lock_is_broken_automatically() {
    let root = TempDir::new().unwrap();
    let mut info = LockInfo::new(root.path());
    info.started_at = chrono::Utc::now() - chrono::Duration::hours(3);
    info.holder = "old-host".to_string();
    fs::write(
        LockInfo::lock_path(root.path()),
        serde_json::to_string(&info).unwrap(),
    )
    .unwrap();

    let lock = DeployLock::acquire(root.path(), false, Duration::from_secs(3600)).unwrap();

    let contents = fs::read_to_string(lock.path()).unwrap();
    let current: LockInfo = serde_json::from_str(&contents).unwrap();
    assert_ne!(current.holder, "old-host");
}

#[test]
fn corrupted_lock_is_broken() {
    let root = TempDir::new().unwrap();
    fs::write(LockInfo::lock_path(root.path()), "not json").unwrap();

    DeployLock::acquire(root.path(), false, DEFAULT_STALE_AFTER).unwrap();
}

#[test]
fn lock_file_is_complete_and_leaves_no_staging_files() {
    let root = TempDir::new().unwrap();
    let lock = DeployLock::acquire(root.path(), false, DEFAULT_STALE_AFTER).unwrap();

    let contents = fs::read_to_string(lock.path()).unwrap();
    let info: LockInfo = serde_json::from_str(&contents).unwrap();
    assert_eq!(info.pid, std::process::id());

    let entries: Vec<_> = fs::read_dir(root.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from(".keel.lock")]);
}

#[test]
fn concurrent_acquires_never_break_a_live_lock() {
    let root = TempDir::new().unwrap();
    let contenders = 8;
    let barrier = Barrier::new(contenders);

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..contenders)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    DeployLock::acquire(root.path(), false, DEFAULT_STALE_AFTER)
                        .map_err(|e| e.kind())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let held: Vec<_> = outcomes.iter().filter(|o| o.is_ok()).collect();
    assert_eq!(held.len(), 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|o| o.as_ref().err())
            .all(|kind| *kind == DeployErrorKind::LockHeld)
    );
}
