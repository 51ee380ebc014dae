// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports the engine, pipeline phases, cutover, rollback planning, and deploy lock.

mod cutover;
mod deployment;
mod descriptor;
mod engine;
mod error;
mod lock;
mod recovery;
mod rollback;
mod state;
mod transitions;

pub use cutover::CutoverManager;
pub use deployment::Deployment;
pub use descriptor::{DeploymentDescriptor, LinkMap, RestartTarget};
pub use engine::{Collaborators, DeployOutcome, Engine};
pub use error::{DeployError, DeployErrorKind, LockHolderInfo};
pub use lock::{DEFAULT_STALE_AFTER, DeployLock, LOCK_FILE, LockInfo};
pub use rollback::RollbackPlan;
pub use state::{Completed, CutOver, Initialized, Installed, Materialized, Migrated, Restarted};
