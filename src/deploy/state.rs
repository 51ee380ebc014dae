// ABOUTME: Pipeline phase marker types for the type state pattern.
// ABOUTME: Each marker names what has happened to the release so far.

use crate::release::Release;

/// Release chosen, nothing on disk yet.
/// Available actions: `materialize()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Source synced and copied into the release directory.
/// Available actions: `install_dependencies()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Materialized;

/// Dependencies installed and ownership enforced.
/// Available actions: `migrate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Installed;

/// Pre-migrate links in place and migrations run.
/// Available actions: `symlink()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Migrated;

/// Shared links in place and `current` points at the release.
/// Available actions: `restart()`
#[derive(Debug, Clone, Copy, Default)]
pub struct CutOver;

/// Restart hooks and restart target have run.
/// Available actions: `cleanup()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Restarted;

/// Retention applied.
/// Available actions: `pruned()`, `finish()`
#[derive(Debug, Clone, Default)]
pub struct Completed {
    pub(crate) pruned: Vec<Release>,
}
