// ABOUTME: Command module aggregator for the keel CLI.
// ABOUTME: Re-exports init, deploy, rollback, and status handlers plus shared config loading.

mod deploy;
mod init;
mod rollback;
mod status;

pub use deploy::deploy;
pub use init::init;
pub use rollback::rollback;
pub use status::status;

use keel::config::Config;
use keel::deploy::{DeployError, DeployLock};
use keel::diagnostics::{Diagnostics, Warning};
use keel::error::Result;
use std::env;
use std::path::Path;

/// Load the config from `--config` or discover it in the working directory.
fn load_config(path: Option<&Path>, revision: Option<String>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::discover(&env::current_dir()?)?,
    };
    if revision.is_some() {
        config.revision = revision;
    }
    Ok(config)
}

/// Run `action` while holding the deploy lock for the config's deploy root.
async fn with_lock<T, F>(
    config: &Config,
    break_lock: bool,
    diag: &mut Diagnostics,
    action: F,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, DeployError>>,
{
    let lock = DeployLock::acquire(&config.deploy_to, break_lock, config.lock.stale_after)?;
    let lock_path = lock.path().to_path_buf();
    let result = action.await;

    if let Err(e) = lock.release() {
        diag.warn(Warning::LockNotReleased {
            lock: lock_path,
            reason: e.to_string(),
        });
    }

    Ok(result?)
}
