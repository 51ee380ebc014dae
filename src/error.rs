// ABOUTME: Crate-level error type for configuration and CLI actions.
// ABOUTME: Wraps deploy errors transparently so their messages reach the user unchanged.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} already exists (pass --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("no keel.yml, keel.yaml, or .keel/config.yml found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("environment variable {0} is referenced by the config but not set")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

pub type Result<T> = std::result::Result<T, Error>;
