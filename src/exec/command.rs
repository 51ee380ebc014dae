// ABOUTME: Command specifications and the executor trait.
// ABOUTME: ProcessExecutor runs commands locally with tokio::process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// What to run: a shell line or an explicit argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Run through `sh -c`.
    Shell(String),
    /// Program followed by its arguments.
    Argv(Vec<String>),
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Shell(line) => f.write_str(line),
            CommandLine::Argv(argv) => f.write_str(&argv.join(" ")),
        }
    }
}

/// A command plus the process settings it runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub line: CommandLine,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub user: Option<String>,
    pub group: Option<String>,
}

impl CommandSpec {
    pub fn shell(line: impl Into<String>) -> Self {
        Self::from_line(CommandLine::Shell(line.into()))
    }

    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_line(CommandLine::Argv(args.into_iter().map(Into::into).collect()))
    }

    fn from_line(line: CommandLine) -> Self {
        Self {
            line,
            cwd: None,
            env: HashMap::new(),
            user: None,
            group: None,
        }
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn envs(mut self, env: &HashMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn user(mut self, user: Option<&str>) -> Self {
        self.user = user.map(str::to_string);
        self
    }

    pub fn group(mut self, group: Option<&str>) -> Self {
        self.group = group.map(str::to_string);
        self
    }

    /// Program and arguments as they will be spawned, including the
    /// privilege wrapper when a user or group is set.
    ///
    /// sudo resets the environment, so under sudo the variables are passed
    /// through `env` on the far side of the privilege boundary.
    pub fn program_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.user.is_some() || self.group.is_some() {
            args.push("sudo".to_string());
            args.push("-n".to_string());
            if let Some(user) = &self.user {
                args.push("-u".to_string());
                args.push(user.clone());
            }
            if let Some(group) = &self.group {
                args.push("-g".to_string());
                args.push(group.clone());
            }
            args.push("--".to_string());

            if !self.env.is_empty() {
                let mut vars: Vec<_> = self.env.iter().collect();
                vars.sort();
                args.push("env".to_string());
                args.extend(vars.into_iter().map(|(key, value)| format!("{key}={value}")));
            }
        }

        match &self.line {
            CommandLine::Shell(line) => {
                args.push("sh".to_string());
                args.push("-c".to_string());
                args.push(line.clone());
            }
            CommandLine::Argv(argv) => args.extend(argv.iter().cloned()),
        }

        args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.line.fmt(f)
    }
}

/// Captured output of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Errors from running a command.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("command is empty")]
    EmptyCommand,

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}: {stderr}", exit_label(.code))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Runs commands to completion.
///
/// Implementations block the caller until the command exits and must return
/// `ExecError::NonZeroExit` for a non-zero status. Timeouts, if any, belong
/// here; the deploy pipeline never imposes its own.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError>;
}

/// Executes commands as local child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        let args = spec.program_args();
        let (program, rest) = args.split_first().ok_or(ExecError::EmptyCommand)?;

        tracing::debug!("Running `{}` in {:?}", spec, spec.cwd);

        let mut command = Command::new(program);
        command
            .args(rest)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let output = command.output().await.map_err(|source| ExecError::Spawn {
            command: spec.to_string(),
            source,
        })?;

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !output.status.success() {
            tracing::warn!(
                "`{}` failed with exit code {:?}",
                spec,
                result.exit_code
            );
            return Err(ExecError::NonZeroExit {
                command: spec.to_string(),
                code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        Ok(result)
    }
}
