// ABOUTME: Hook callback specifications as written in configuration.
// ABOUTME: A callback is a relative file path, an embedded script, or invalid.

use serde::Deserialize;

use crate::types::HookName;

/// An inline script run by the hook evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddedScript {
    pub script: String,
}

impl EmbeddedScript {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

/// The value configured for a hook point.
///
/// Anything that is neither a string nor a `{script: ...}` mapping lands in
/// `Other` and is rejected when the hook is resolved, not when the
/// configuration is parsed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CallbackCode {
    /// Release-relative path to a hook file.
    File(String),
    Script(EmbeddedScript),
    Other(serde_yaml::Value),
}

impl CallbackCode {
    pub fn file(path: impl Into<String>) -> Self {
        CallbackCode::File(path.into())
    }

    pub fn script(script: impl Into<String>) -> Self {
        CallbackCode::Script(EmbeddedScript::new(script))
    }
}

/// Callbacks configured for the four hook points.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookSet {
    #[serde(default)]
    pub before_migrate: Option<CallbackCode>,
    #[serde(default)]
    pub before_symlink: Option<CallbackCode>,
    #[serde(default)]
    pub before_restart: Option<CallbackCode>,
    #[serde(default)]
    pub after_restart: Option<CallbackCode>,
}

impl HookSet {
    pub fn get(&self, name: HookName) -> Option<&CallbackCode> {
        match name {
            HookName::BeforeMigrate => self.before_migrate.as_ref(),
            HookName::BeforeSymlink => self.before_symlink.as_ref(),
            HookName::BeforeRestart => self.before_restart.as_ref(),
            HookName::AfterRestart => self.after_restart.as_ref(),
        }
    }

    pub fn set(&mut self, name: HookName, code: CallbackCode) {
        let slot = match name {
            HookName::BeforeMigrate => &mut self.before_migrate,
            HookName::BeforeSymlink => &mut self.before_symlink,
            HookName::BeforeRestart => &mut self.before_restart,
            HookName::AfterRestart => &mut self.after_restart,
        };
        *slot = Some(code);
    }
}
