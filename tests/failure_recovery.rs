// ABOUTME: Integration tests for automatic recovery after a failed deploy.
// ABOUTME: The previous release is restored, the failed one deleted, and the error re-raised.

mod support;

use keel::deploy::{DeployError, DeployErrorKind, RestartTarget};
use keel::hooks::CallbackCode;
use keel::release::Release;
use keel::types::{HookName, ReleaseSlug};
use support::Fixture;

fn with_previous_release() -> Fixture {
    let fixture = Fixture::new();
    fixture.seed_release("p1");
    fixture.point_current("p1");
    fixture
}

#[tokio::test]
async fn failure_after_cutover_restores_previous_release() {
    let fixture = with_previous_release();
    fixture.hooks.fail_on("after_restart");
    let mut descriptor = fixture.descriptor("n1");
    descriptor
        .hooks
        .set(HookName::AfterRestart, CallbackCode::script("boom"));

    let err = fixture.engine(descriptor).deploy().await.unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::HookExecutionError);
    assert_eq!(fixture.current_slug().as_deref(), Some("p1"));
    assert_eq!(fixture.slugs_on_disk(), vec!["p1"]);
    assert_eq!(
        fixture.observer.deleted.lock().as_slice(),
        [fixture.releases_dir().join("n1")]
    );
}

#[tokio::test]
async fn recovery_restarts_the_previous_release() {
    let fixture = with_previous_release();
    fixture.executor.fail_on("migrate-db");
    let mut descriptor = fixture.descriptor("n1");
    descriptor.migrate = true;
    descriptor.migration_command = Some("migrate-db".to_string());
    descriptor.restart = Some(RestartTarget::Command("restart-app".to_string()));

    let err = fixture.engine(descriptor).deploy().await.unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::CommandFailed);
    let entries = fixture.journal.entries();
    assert_eq!(entries.last().map(String::as_str), Some("exec:restart-app"));
    assert_eq!(fixture.current_slug().as_deref(), Some("p1"));
    assert_eq!(fixture.slugs_on_disk(), vec!["p1"]);
}

#[tokio::test]
async fn failing_first_deploy_before_cutover_leaves_no_trace() {
    let fixture = Fixture::new();
    fixture.hooks.fail_on("before_migrate");
    let mut descriptor = fixture.descriptor("n1");
    descriptor
        .hooks
        .set(HookName::BeforeMigrate, CallbackCode::script("boom"));

    let err = fixture.engine(descriptor).deploy().await.unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::HookExecutionError);
    assert!(fixture.current_slug().is_none());
    assert!(fixture.slugs_on_disk().is_empty());
}

#[tokio::test]
async fn failing_first_deploy_after_cutover_removes_current() {
    let fixture = Fixture::new();
    fixture.hooks.fail_on("after_restart");
    let mut descriptor = fixture.descriptor("n1");
    descriptor
        .hooks
        .set(HookName::AfterRestart, CallbackCode::script("boom"));

    fixture.engine(descriptor).deploy().await.unwrap_err();

    assert!(std::fs::symlink_metadata(fixture.current()).is_err());
    assert!(fixture.slugs_on_disk().is_empty());
}

#[tokio::test]
async fn missing_explicit_hook_aborts_and_recovers() {
    let fixture = with_previous_release();
    let mut descriptor = fixture.descriptor("n1");
    descriptor
        .hooks
        .set(HookName::BeforeSymlink, CallbackCode::file("deploy/nope.rb"));

    let err = fixture.engine(descriptor).deploy().await.unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::HookNotFound);
    assert_eq!(fixture.current_slug().as_deref(), Some("p1"));
    assert_eq!(fixture.slugs_on_disk(), vec!["p1"]);
}

#[tokio::test]
async fn failed_recovery_reports_both_errors() {
    let fixture = with_previous_release();
    fixture.executor.fail_on("restart-app");
    let mut descriptor = fixture.descriptor("n1");
    descriptor.restart = Some(RestartTarget::Command("restart-app".to_string()));

    let err = fixture.engine(descriptor).deploy().await.unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::RecoveryFailed);
    let DeployError::RecoveryFailed { original, recovery } = &err else {
        unreachable!();
    };
    assert_eq!(original.kind(), DeployErrorKind::CommandFailed);
    assert_eq!(recovery.kind(), DeployErrorKind::CommandFailed);

    // Cutover back succeeded before the restart failed
    assert_eq!(fixture.current_slug().as_deref(), Some("p1"));
}

#[tokio::test]
async fn recovery_keeps_new_release_when_previous_was_pruned() {
    let fixture = with_previous_release();
    fixture.hooks.fail_on("after_restart");
    let mut descriptor = fixture.descriptor("n1");
    descriptor
        .hooks
        .set(HookName::AfterRestart, CallbackCode::script("boom"));
    let engine = fixture.engine(descriptor);

    let previous = Release::new(&fixture.releases_dir(), ReleaseSlug::new("p1").unwrap());
    std::fs::remove_dir_all(previous.path()).unwrap();
    let release = Release::new(&fixture.releases_dir(), ReleaseSlug::new("n1").unwrap());

    let err = engine
        .deploy_with_recovery(release, Some(previous))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::RecoveryFailed);
    let DeployError::RecoveryFailed { original, recovery } = &err else {
        unreachable!();
    };
    assert_eq!(original.kind(), DeployErrorKind::HookExecutionError);
    assert_eq!(recovery.kind(), DeployErrorKind::NoSuchRelease);
    assert_eq!(fixture.current_slug().as_deref(), Some("n1"));
    assert_eq!(fixture.slugs_on_disk(), vec!["n1"]);
}
