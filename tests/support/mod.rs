// ABOUTME: Test support utilities.
// ABOUTME: Recording collaborators and temporary deploy roots for engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use keel::deploy::{Collaborators, DeploymentDescriptor, Engine};
use keel::exec::{CommandExecutor, CommandOutput, CommandSpec, ExecError};
use keel::hooks::{HookContext, HookError, HookEvaluator};
use keel::observe::ReleaseObserver;
use keel::release::copy_dir_recursive;
use keel::scm::{SourceError, SourceSync};
use parking_lot::Mutex;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("keel=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Ordered log shared by the recording collaborators.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().iter().any(|e| e == entry)
    }
}

/// Records every command as `exec:{line}`, fails those containing a
/// configured pattern, and answers others with canned stdout.
#[derive(Default)]
pub struct RecordingExecutor {
    journal: Journal,
    specs: Mutex<Vec<CommandSpec>>,
    fail_on: Mutex<Vec<String>>,
    responses: Mutex<Vec<(String, String)>>,
}

impl RecordingExecutor {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn fail_on(&self, pattern: &str) {
        self.fail_on.lock().push(pattern.to_string());
    }

    /// Reply with `stdout` to commands containing `pattern`.
    pub fn respond(&self, pattern: &str, stdout: &str) {
        self.responses
            .lock()
            .push((pattern.to_string(), stdout.to_string()));
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.specs.lock().clone()
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        let line = spec.to_string();
        self.journal.push(format!("exec:{line}"));
        self.specs.lock().push(spec.clone());

        if self.fail_on.lock().iter().any(|p| line.contains(p.as_str())) {
            return Err(ExecError::NonZeroExit {
                command: line,
                code: Some(1),
                stderr: "simulated failure".to_string(),
            });
        }

        let stdout = self
            .responses
            .lock()
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, stdout)| stdout.clone())
            .unwrap_or_default();

        Ok(CommandOutput {
            exit_code: Some(0),
            stdout,
            ..CommandOutput::default()
        })
    }
}

/// Records hook runs as `hook:{name}` and fails configured hook names.
#[derive(Default)]
pub struct RecordingHooks {
    journal: Journal,
    contexts: Mutex<Vec<(String, PathBuf, Option<PathBuf>)>>,
    fail_on: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn fail_on(&self, hook: &str) {
        self.fail_on.lock().push(hook.to_string());
    }

    /// `(hook, release_path, file)` per run; `file` is `None` for scripts.
    pub fn runs(&self) -> Vec<(String, PathBuf, Option<PathBuf>)> {
        self.contexts.lock().clone()
    }

    fn record(&self, context: &HookContext, file: Option<&Path>) -> Result<(), HookError> {
        self.journal.push(format!("hook:{}", context.hook));
        self.contexts.lock().push((
            context.hook.clone(),
            context.release_path.clone(),
            file.map(Path::to_path_buf),
        ));

        if self.fail_on.lock().contains(&context.hook) {
            return Err(HookError::Failed {
                hook: context.hook.clone(),
                message: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl HookEvaluator for RecordingHooks {
    async fn eval_file(&self, path: &Path, context: HookContext) -> Result<(), HookError> {
        self.record(&context, Some(path))
    }

    async fn eval_script(&self, _script: &str, context: HookContext) -> Result<(), HookError> {
        self.record(&context, None)
    }
}

/// Source whose working copy is a directory the test fills in.
pub struct FakeSource {
    journal: Journal,
    working_copy: PathBuf,
    pristine: PathBuf,
}

impl FakeSource {
    pub fn new(journal: Journal, working_copy: PathBuf, pristine: PathBuf) -> Self {
        Self {
            journal,
            working_copy,
            pristine,
        }
    }
}

#[async_trait]
impl SourceSync for FakeSource {
    fn working_copy(&self) -> &Path {
        &self.working_copy
    }

    async fn sync(&self) -> Result<(), SourceError> {
        self.journal.push("source:sync");
        copy_dir_recursive(&self.pristine, &self.working_copy)?;
        Ok(())
    }

    async fn force_export(&self, destination: &Path) -> Result<(), SourceError> {
        self.journal.push("source:export");
        copy_dir_recursive(&self.pristine, destination)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub created: Mutex<Vec<PathBuf>>,
    pub deleted: Mutex<Vec<PathBuf>>,
}

impl ReleaseObserver for RecordingObserver {
    fn release_created(&self, path: &Path) {
        self.created.lock().push(path.to_path_buf());
    }

    fn release_deleted(&self, path: &Path) {
        self.deleted.lock().push(path.to_path_buf());
    }
}

/// A deploy root and source tree in a temp dir, wired to recording
/// collaborators.
pub struct Fixture {
    pub dir: TempDir,
    pub journal: Journal,
    pub executor: Arc<RecordingExecutor>,
    pub hooks: Arc<RecordingHooks>,
    pub observer: Arc<RecordingObserver>,
    pub source: Arc<FakeSource>,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let journal = Journal::default();

        let pristine = dir.path().join("src");
        fs::create_dir_all(pristine.join("config")).unwrap();
        fs::write(pristine.join("README"), "app\n").unwrap();

        let source = FakeSource::new(
            journal.clone(),
            dir.path().join("cache"),
            pristine,
        );

        Self {
            executor: Arc::new(RecordingExecutor::new(journal.clone())),
            hooks: Arc::new(RecordingHooks::new(journal.clone())),
            observer: Arc::new(RecordingObserver::default()),
            source: Arc::new(source),
            journal,
            dir,
        }
    }

    /// Directory the fake source copies from.
    pub fn source_dir(&self) -> PathBuf {
        self.dir.path().join("src")
    }

    pub fn deploy_to(&self) -> PathBuf {
        self.dir.path().join("app")
    }

    pub fn releases_dir(&self) -> PathBuf {
        self.deploy_to().join("releases")
    }

    pub fn current(&self) -> PathBuf {
        self.deploy_to().join("current")
    }

    pub fn descriptor(&self, revision: &str) -> DeploymentDescriptor {
        let mut descriptor = DeploymentDescriptor::new(self.deploy_to());
        descriptor.revision = Some(revision.to_string());
        descriptor
    }

    pub fn engine(&self, descriptor: DeploymentDescriptor) -> Engine {
        let collaborators = Collaborators::new(self.source.clone(), self.executor.clone())
            .with_hooks(self.hooks.clone())
            .with_observer(self.observer.clone());
        Engine::new(descriptor, collaborators)
    }

    /// Create `releases/{slug}` with a marker file.
    pub fn seed_release(&self, slug: &str) -> PathBuf {
        let path = self.releases_dir().join(slug);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("REVISION"), slug).unwrap();
        path
    }

    /// Point `current` at `releases/{slug}`.
    pub fn point_current(&self, slug: &str) {
        let _ = fs::remove_file(self.current());
        symlink(self.releases_dir().join(slug), self.current()).unwrap();
    }

    /// Slug `current` points at, if any.
    pub fn current_slug(&self) -> Option<String> {
        let target = fs::read_link(self.current()).ok()?;
        Some(target.file_name()?.to_string_lossy().into_owned())
    }

    /// Release directory names on disk, sorted.
    pub fn slugs_on_disk(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.releases_dir()) else {
            return Vec::new();
        };
        let mut slugs: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        slugs.sort();
        slugs
    }
}
