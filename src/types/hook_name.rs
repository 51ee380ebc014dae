// ABOUTME: Named hook points in the deployment pipeline.
// ABOUTME: Maps each point to its conventional file under deploy/.

use std::fmt;
use std::path::PathBuf;

/// Directory (relative to a release) holding conventional hook files.
pub const CONVENTIONAL_HOOK_DIR: &str = "deploy";

/// Extension of conventional hook files.
pub const CONVENTIONAL_HOOK_EXT: &str = "rb";

/// Pipeline points where caller-supplied code may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    BeforeMigrate,
    BeforeSymlink,
    BeforeRestart,
    AfterRestart,
}

impl HookName {
    pub const ALL: [HookName; 4] = [
        HookName::BeforeMigrate,
        HookName::BeforeSymlink,
        HookName::BeforeRestart,
        HookName::AfterRestart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookName::BeforeMigrate => "before_migrate",
            HookName::BeforeSymlink => "before_symlink",
            HookName::BeforeRestart => "before_restart",
            HookName::AfterRestart => "after_restart",
        }
    }

    /// Release-relative path of the conventional hook file, e.g.
    /// `deploy/before_migrate.rb`.
    pub fn conventional_path(&self) -> PathBuf {
        PathBuf::from(CONVENTIONAL_HOOK_DIR)
            .join(format!("{}.{}", self.as_str(), CONVENTIONAL_HOOK_EXT))
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
