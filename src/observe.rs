// ABOUTME: Observation hooks for release directory bookkeeping.
// ABOUTME: Notified when release directories are created or deleted.

use std::path::Path;

/// Receives release lifecycle observations from the release store.
///
/// Both methods default to doing nothing. Implement this to keep an external
/// record of releases (a metadata cache, an audit log) in step with disk.
pub trait ReleaseObserver: Send + Sync {
    fn release_created(&self, _path: &Path) {}

    fn release_deleted(&self, _path: &Path) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ReleaseObserver for NoopObserver {}

/// Observer that logs each observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ReleaseObserver for TracingObserver {
    fn release_created(&self, path: &Path) {
        tracing::info!("Release created: {}", path.display());
    }

    fn release_deleted(&self, path: &Path) {
        tracing::info!("Release deleted: {}", path.display());
    }
}
