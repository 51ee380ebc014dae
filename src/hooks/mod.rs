// ABOUTME: Hook resolution and execution for deployment lifecycle points.
// ABOUTME: Resolves callbacks to embedded scripts, explicit files, or conventional files.

mod callback;
mod evaluator;

pub use callback::{CallbackCode, EmbeddedScript, HookSet};
pub use evaluator::{
    DEFAULT_INLINE_FLAG, DEFAULT_INTERPRETER, HookEvaluator, InterpreterHookEvaluator,
};

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::types::HookName;

/// Errors from resolving or running a hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// An explicitly configured hook file is missing.
    #[error("{hook} hook not found at {}", path.display())]
    NotFound { hook: String, path: PathBuf },

    /// The configured callback is neither a relative path nor a script.
    #[error("invalid {hook} hook specification: {detail}")]
    InvalidSpecification { hook: String, detail: String },

    /// The hook ran and failed.
    #[error("{hook} hook failed: {message}")]
    Failed { hook: String, message: String },
}

/// Deploy-wide values every hook context is built from.
#[derive(Debug, Clone, Default)]
pub struct HookScope {
    pub deploy_to: PathBuf,
    pub current_path: PathBuf,
    pub shared_path: PathBuf,
    pub environment: HashMap<String, String>,
    pub user: Option<String>,
    pub group: Option<String>,
}

/// Execution context for a single hook run.
///
/// Built fresh for each invocation and moved into the evaluator.
#[derive(Debug)]
pub struct HookContext {
    pub hook: String,
    pub release_path: PathBuf,
    pub deploy_to: PathBuf,
    pub current_path: PathBuf,
    pub shared_path: PathBuf,
    pub environment: HashMap<String, String>,
    pub user: Option<String>,
    pub group: Option<String>,
}

impl HookContext {
    pub fn new(hook: impl Into<String>, release_path: &Path, scope: &HookScope) -> Self {
        Self {
            hook: hook.into(),
            release_path: release_path.to_path_buf(),
            deploy_to: scope.deploy_to.clone(),
            current_path: scope.current_path.clone(),
            shared_path: scope.shared_path.clone(),
            environment: scope.environment.clone(),
            user: scope.user.clone(),
            group: scope.group.clone(),
        }
    }

    /// Configured environment plus `KEEL_*` variables describing the run.
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = self.environment.clone();
        env.insert("KEEL_HOOK".to_string(), self.hook.clone());
        env.insert(
            "KEEL_RELEASE_PATH".to_string(),
            self.release_path.display().to_string(),
        );
        if let Some(name) = self.release_path.file_name() {
            env.insert(
                "KEEL_RELEASE".to_string(),
                name.to_string_lossy().into_owned(),
            );
        }
        env.insert(
            "KEEL_CURRENT_PATH".to_string(),
            self.current_path.display().to_string(),
        );
        env.insert(
            "KEEL_SHARED_PATH".to_string(),
            self.shared_path.display().to_string(),
        );
        env.insert(
            "KEEL_DEPLOY_TO".to_string(),
            self.deploy_to.display().to_string(),
        );
        env
    }
}

/// What a hook point resolves to for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    /// Inline script handed to the evaluator.
    Embedded(String),
    /// Explicitly configured file that exists.
    ExplicitFile(PathBuf),
    /// `deploy/{hook}.rb` found in the release.
    ConventionalFile(PathBuf),
    /// Nothing configured and no conventional file.
    Skip,
}

/// Resolves hook points and runs them through a [`HookEvaluator`].
#[derive(Clone)]
pub struct CallbackResolver {
    evaluator: Arc<dyn HookEvaluator>,
}

impl std::fmt::Debug for CallbackResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackResolver").finish_non_exhaustive()
    }
}

impl CallbackResolver {
    pub fn new(evaluator: Arc<dyn HookEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Decide what running `what` means for the release at `release_path`.
    pub fn resolve(
        what: HookName,
        code: Option<&CallbackCode>,
        release_path: &Path,
    ) -> Result<HookAction, HookError> {
        match code {
            Some(CallbackCode::Script(embedded)) => Ok(HookAction::Embedded(embedded.script.clone())),
            Some(CallbackCode::File(relative)) => {
                let relative = validate_relative(what, relative)?;
                let path = release_path.join(relative);
                if path.exists() {
                    Ok(HookAction::ExplicitFile(path))
                } else {
                    Err(HookError::NotFound {
                        hook: what.to_string(),
                        path,
                    })
                }
            }
            Some(CallbackCode::Other(value)) => Err(HookError::InvalidSpecification {
                hook: what.to_string(),
                detail: format!("expected a relative path or {{script: ...}}, got {value:?}"),
            }),
            None => {
                let path = release_path.join(what.conventional_path());
                if path.exists() {
                    Ok(HookAction::ConventionalFile(path))
                } else {
                    Ok(HookAction::Skip)
                }
            }
        }
    }

    /// Resolve and run a hook point.
    pub async fn run(
        &self,
        what: HookName,
        code: Option<&CallbackCode>,
        release_path: &Path,
        scope: &HookScope,
    ) -> Result<(), HookError> {
        let action = Self::resolve(what, code, release_path)?;
        self.execute(what.as_str(), action, release_path, scope)
            .await
    }

    /// Run an embedded script that is not tied to a hook point (restart).
    pub async fn run_script(
        &self,
        label: &str,
        script: &str,
        release_path: &Path,
        scope: &HookScope,
    ) -> Result<(), HookError> {
        self.execute(
            label,
            HookAction::Embedded(script.to_string()),
            release_path,
            scope,
        )
        .await
    }

    async fn execute(
        &self,
        label: &str,
        action: HookAction,
        release_path: &Path,
        scope: &HookScope,
    ) -> Result<(), HookError> {
        let context = HookContext::new(label, release_path, scope);

        match action {
            HookAction::Embedded(script) => self.evaluator.eval_script(&script, context).await,
            HookAction::ExplicitFile(path) | HookAction::ConventionalFile(path) => {
                self.evaluator.eval_file(&path, context).await
            }
            HookAction::Skip => {
                tracing::debug!("No {} hook configured", label);
                Ok(())
            }
        }
    }
}

fn validate_relative<'a>(what: HookName, relative: &'a str) -> Result<&'a Path, HookError> {
    let path = Path::new(relative);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if relative.trim().is_empty() || escapes {
        return Err(HookError::InvalidSpecification {
            hook: what.to_string(),
            detail: format!("hook path must be relative to the release: {relative:?}"),
        });
    }

    Ok(path)
}
