// ABOUTME: Environment values for commands and hooks, literal or read from the caller's env.
// ABOUTME: Resolved once when the deploy descriptor is built.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// A value in the `environment:` map.
///
/// ```yaml
/// environment:
///   RAILS_ENV: production
///   SECRET_KEY_BASE: { env: SECRET_KEY_BASE }
///   LOG_LEVEL: { env: LOG_LEVEL, default: info }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

/// Resolve every value, failing on the first missing variable.
pub fn resolve_env_map(map: &HashMap<String, EnvValue>) -> Result<HashMap<String, String>> {
    map.iter()
        .map(|(k, v)| v.resolve().map(|resolved| (k.clone(), resolved)))
        .collect()
}
