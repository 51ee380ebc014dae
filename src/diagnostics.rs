// ABOUTME: Non-fatal problems noticed while running a deploy or rollback.
// ABOUTME: Collected during the action and reported after its outcome.

use std::fmt;
use std::path::PathBuf;

use crate::output::Output;

/// Something the user should know about that did not fail the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The deploy lock file could not be removed after the action.
    LockNotReleased { lock: PathBuf, reason: String },
    /// More releases remain than `keep_releases` allows, usually because
    /// the current release is older than the newest ones on disk.
    RetentionExceeded { on_disk: usize, keep: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::LockNotReleased { lock, reason } => write!(
                f,
                "deploy lock {} was not removed ({reason}); the next action may need --break-lock",
                lock.display()
            ),
            Warning::RetentionExceeded { on_disk, keep } => {
                write!(f, "{on_disk} releases on disk, keep_releases is {keep}")
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning; it is also logged immediately.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Warn if `on_disk` releases exceed the retention count.
    pub fn check_retention(&mut self, on_disk: usize, keep: usize) {
        if on_disk > keep {
            self.warn(Warning::RetentionExceeded { on_disk, keep });
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Print every collected warning through `output`.
    pub fn report(&self, output: &Output) {
        for warning in &self.warnings {
            output.warning(&warning.to_string());
        }
    }
}
