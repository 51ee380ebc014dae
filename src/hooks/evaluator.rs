// ABOUTME: Hook evaluator trait and the interpreter-backed implementation.
// ABOUTME: Runs hook files and embedded scripts inside the release directory.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::exec::{CommandExecutor, CommandSpec};

use super::{HookContext, HookError};

/// Default interpreter for hook files and embedded scripts.
pub const DEFAULT_INTERPRETER: &str = "ruby";

/// Default flag passing an inline script to the interpreter.
pub const DEFAULT_INLINE_FLAG: &str = "-e";

/// Executes hooks.
///
/// The context is taken by value: every invocation gets a freshly built
/// context and nothing carries over between hooks.
#[async_trait]
pub trait HookEvaluator: Send + Sync {
    async fn eval_file(&self, path: &Path, context: HookContext) -> Result<(), HookError>;

    async fn eval_script(&self, script: &str, context: HookContext) -> Result<(), HookError>;
}

/// Runs hooks with an external interpreter through the command executor.
pub struct InterpreterHookEvaluator {
    interpreter: Vec<String>,
    inline_flag: String,
    executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for InterpreterHookEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpreterHookEvaluator")
            .field("interpreter", &self.interpreter)
            .field("inline_flag", &self.inline_flag)
            .finish()
    }
}

impl InterpreterHookEvaluator {
    pub fn new(
        interpreter: Vec<String>,
        inline_flag: impl Into<String>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            interpreter,
            inline_flag: inline_flag.into(),
            executor,
        }
    }

    /// `ruby FILE` / `ruby -e SCRIPT`.
    pub fn ruby(executor: Arc<dyn CommandExecutor>) -> Self {
        Self::new(
            vec![DEFAULT_INTERPRETER.to_string()],
            DEFAULT_INLINE_FLAG,
            executor,
        )
    }

    async fn run(&self, mut args: Vec<String>, context: HookContext) -> Result<(), HookError> {
        let mut argv = self.interpreter.clone();
        argv.append(&mut args);

        let spec = CommandSpec::argv(argv)
            .cwd(&context.release_path)
            .envs(&context.to_env())
            .user(context.user.as_deref())
            .group(context.group.as_deref());

        self.executor
            .run(&spec)
            .await
            .map(|_| ())
            .map_err(|e| HookError::Failed {
                hook: context.hook.clone(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl HookEvaluator for InterpreterHookEvaluator {
    async fn eval_file(&self, path: &Path, context: HookContext) -> Result<(), HookError> {
        tracing::info!("Running {} hook: {}", context.hook, path.display());
        self.run(vec![path.display().to_string()], context).await
    }

    async fn eval_script(&self, script: &str, context: HookContext) -> Result<(), HookError> {
        tracing::info!("Running embedded {} hook", context.hook);
        self.run(vec![self.inline_flag.clone(), script.to_string()], context)
            .await
    }
}
