// ABOUTME: Configuration types and parsing for keel.yml.
// ABOUTME: Handles YAML parsing, defaults, validation, and building the deploy engine inputs.

mod deserialize;
mod env_value;
mod init;

pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;

use crate::deploy::{Collaborators, DEFAULT_STALE_AFTER, DeploymentDescriptor, LinkMap, RestartTarget};
use crate::error::{Error, Result};
use crate::exec::{CommandExecutor, Ownership};
use crate::hooks::{DEFAULT_INLINE_FLAG, DEFAULT_INTERPRETER, HookSet, InterpreterHookEvaluator};
use crate::install::ManifestInstaller;
use crate::observe::TracingObserver;
use crate::release::DEFAULT_KEEP_RELEASES;
use crate::scm::{DirectorySource, GitSource, SourceSync};
use deserialize::{deserialize_keep_releases, deserialize_revision};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "keel.yml";
pub const CONFIG_FILENAME_ALT: &str = "keel.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".keel/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub deploy_to: PathBuf,

    #[serde(default)]
    pub shared_path: Option<PathBuf>,

    #[serde(default)]
    pub current_path: Option<PathBuf>,

    #[serde(default, deserialize_with = "deserialize_revision")]
    pub revision: Option<String>,

    #[serde(
        default = "default_keep_releases",
        deserialize_with = "deserialize_keep_releases"
    )]
    pub keep_releases: usize,

    pub source: SourceConfig,

    #[serde(default)]
    pub cached_copy: Option<PathBuf>,

    #[serde(default)]
    pub force_export: bool,

    #[serde(default = "default_symlink_before_migrate")]
    pub symlink_before_migrate: LinkMap,

    #[serde(default = "default_symlinks")]
    pub symlinks: LinkMap,

    #[serde(default = "default_purge_before_symlink")]
    pub purge_before_symlink: Vec<PathBuf>,

    #[serde(default = "default_create_dirs_before_symlink")]
    pub create_dirs_before_symlink: Vec<PathBuf>,

    #[serde(default)]
    pub migrate: bool,

    #[serde(default)]
    pub migration_command: Option<String>,

    #[serde(default)]
    pub restart: Option<RestartTarget>,

    #[serde(default)]
    pub hooks: HookSet,

    #[serde(default)]
    pub hook_runner: HookRunnerConfig,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub environment: HashMap<String, EnvValue>,

    #[serde(default)]
    pub dependencies: Option<DependenciesConfig>,

    #[serde(default)]
    pub lock: LockConfig,
}

/// Where releases come from. Exactly one field must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Git repository URL or path.
    #[serde(default)]
    pub git: Option<String>,
    /// Local directory copied as-is.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookRunnerConfig {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_inline_flag")]
    pub inline_flag: String,
}

impl Default for HookRunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            inline_flag: default_inline_flag(),
        }
    }
}

fn default_interpreter() -> String {
    DEFAULT_INTERPRETER.to_string()
}

fn default_inline_flag() -> String {
    DEFAULT_INLINE_FLAG.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependenciesConfig {
    /// File whose presence in the release triggers the install.
    pub manifest: PathBuf,
    pub command: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    #[serde(default = "default_stale_after", with = "humantime_serde")]
    pub stale_after: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            stale_after: default_stale_after(),
        }
    }
}

fn default_stale_after() -> Duration {
    DEFAULT_STALE_AFTER
}

fn default_keep_releases() -> usize {
    DEFAULT_KEEP_RELEASES
}

fn default_symlink_before_migrate() -> LinkMap {
    LinkMap::new().with("config/database.yml", "config/database.yml")
}

fn default_symlinks() -> LinkMap {
    LinkMap::new()
        .with("system", "public/system")
        .with("pids", "tmp/pids")
        .with("log", "log")
}

fn default_purge_before_symlink() -> Vec<PathBuf> {
    ["log", "tmp/pids", "public/system"]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

fn default_create_dirs_before_symlink() -> Vec<PathBuf> {
    ["tmp", "public", "config"]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("Loading config from {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        match (&self.source.git, &self.source.directory) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidConfig(
                    "source: set either git or directory, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(Error::InvalidConfig(
                    "source: one of git or directory is required".to_string(),
                ));
            }
            _ => {}
        }

        if self.migrate && self.migration_command.is_none() {
            return Err(Error::InvalidConfig(
                "migrate is enabled but migration_command is not set".to_string(),
            ));
        }

        for (field, links) in [
            ("symlink_before_migrate", &self.symlink_before_migrate),
            ("symlinks", &self.symlinks),
        ] {
            for (source, dest) in links.iter() {
                check_relative(field, source)?;
                check_relative(field, dest)?;
            }
        }

        for (field, dirs) in [
            ("purge_before_symlink", &self.purge_before_symlink),
            ("create_dirs_before_symlink", &self.create_dirs_before_symlink),
        ] {
            for dir in dirs {
                check_relative(field, dir)?;
            }
        }

        if let Some(deps) = &self.dependencies {
            check_relative("dependencies.manifest", &deps.manifest)?;
        }

        Ok(())
    }

    pub fn shared_path(&self) -> PathBuf {
        self.shared_path
            .clone()
            .unwrap_or_else(|| self.deploy_to.join("shared"))
    }

    pub fn current_path(&self) -> PathBuf {
        self.current_path
            .clone()
            .unwrap_or_else(|| self.deploy_to.join("current"))
    }

    /// Long-lived working copy the source syncs into.
    pub fn cached_copy(&self) -> PathBuf {
        self.cached_copy
            .clone()
            .unwrap_or_else(|| self.shared_path().join("cached-copy"))
    }

    pub fn ownership(&self) -> Ownership {
        Ownership::new(self.user.clone(), self.group.clone())
    }

    /// Build the per-invocation descriptor, resolving environment values.
    pub fn descriptor(&self) -> Result<DeploymentDescriptor> {
        let mut descriptor = DeploymentDescriptor::new(&self.deploy_to);
        descriptor.shared_path = self.shared_path();
        descriptor.current_path = self.current_path();
        descriptor.revision = self.revision.clone();
        descriptor.keep_releases = self.keep_releases;
        descriptor.symlink_before_migrate = self.symlink_before_migrate.clone();
        descriptor.symlinks = self.symlinks.clone();
        descriptor.purge_before_symlink = self.purge_before_symlink.clone();
        descriptor.create_dirs_before_symlink = self.create_dirs_before_symlink.clone();
        descriptor.migrate = self.migrate;
        descriptor.migration_command = self.migration_command.clone();
        descriptor.restart = self.restart.clone();
        descriptor.hooks = self.hooks.clone();
        descriptor.force_export = self.force_export;
        descriptor.ownership = self.ownership();
        descriptor.environment = resolve_env_map(&self.environment)?;
        Ok(descriptor)
    }

    /// Concrete source, installer, and hook evaluator for this config.
    pub fn collaborators(
        &self,
        descriptor: &DeploymentDescriptor,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Collaborators> {
        let source: Arc<dyn SourceSync> = match (&self.source.git, &self.source.directory) {
            (Some(repository), None) => {
                let mut git = GitSource::new(repository.clone(), self.cached_copy(), executor.clone())
                    .env(descriptor.environment.clone())
                    .owner(self.user.clone(), self.group.clone());
                if let Some(revision) = &self.revision {
                    git = git.revision(revision.clone());
                }
                Arc::new(git)
            }
            (None, Some(directory)) => Arc::new(DirectorySource::new(directory, self.cached_copy())),
            _ => {
                return Err(Error::InvalidConfig(
                    "source: exactly one of git or directory is required".to_string(),
                ));
            }
        };

        let interpreter = self
            .hook_runner
            .interpreter
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let hooks = InterpreterHookEvaluator::new(
            interpreter,
            self.hook_runner.inline_flag.clone(),
            executor.clone(),
        );

        let mut collaborators = Collaborators::new(source, executor.clone())
            .with_hooks(Arc::new(hooks))
            .with_observer(Arc::new(TracingObserver));

        if let Some(deps) = &self.dependencies {
            let installer = ManifestInstaller::new(&deps.manifest, deps.command.clone(), executor)
                .env(descriptor.environment.clone())
                .ownership(descriptor.ownership.clone());
            collaborators = collaborators.with_installer(Arc::new(installer));
        }

        Ok(collaborators)
    }
}

fn check_relative(field: &str, path: &Path) -> Result<()> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.as_os_str().is_empty() || escapes {
        return Err(Error::InvalidConfig(format!(
            "{field}: {} must be a relative path inside the release",
            path.display()
        )));
    }
    Ok(())
}
