// ABOUTME: Integration tests for release listing, creation, deletion, and retention.
// ABOUTME: Covers slug ordering and the prune policy with property tests.

mod support;

use keel::release::{Release, ReleaseHistory, ReleaseStore};
use keel::types::ReleaseSlug;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use support::RecordingObserver;
use tempfile::TempDir;

fn history_of(slugs: &[String]) -> ReleaseHistory {
    ReleaseHistory::new(
        slugs
            .iter()
            .map(|s| Release::new(Path::new("/srv/app/releases"), ReleaseSlug::new(s).unwrap()))
            .collect(),
    )
}

#[test]
fn list_sorts_releases_and_skips_noise() {
    let root = TempDir::new().unwrap();
    let releases = root.path().join("releases");
    for slug in ["20240103000000", "20240101000000", "20240102000000"] {
        fs::create_dir_all(releases.join(slug)).unwrap();
    }
    fs::write(releases.join("stray-file"), "x").unwrap();
    fs::create_dir_all(releases.join(".hidden")).unwrap();

    let store = ReleaseStore::new(root.path(), Arc::new(RecordingObserver::default()));
    let history = store.list().unwrap();

    assert_eq!(
        history.slugs(),
        vec!["20240101000000", "20240102000000", "20240103000000"]
    );
}

#[test]
fn list_of_missing_root_is_empty() {
    let root = TempDir::new().unwrap();
    let store = ReleaseStore::new(&root.path().join("nope"), Arc::new(RecordingObserver::default()));
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn create_and_delete_emit_observations() {
    let root = TempDir::new().unwrap();
    let observer = Arc::new(RecordingObserver::default());
    let store = ReleaseStore::new(root.path(), observer.clone());

    let release = store.create(&ReleaseSlug::new("r1").unwrap()).unwrap();
    assert!(root.path().join("releases").is_dir());
    assert!(!release.path().exists(), "create only reserves the path");
    assert_eq!(observer.created.lock().as_slice(), [release.path().to_path_buf()]);

    fs::create_dir_all(release.path().join("nested")).unwrap();
    store.delete(release.path()).unwrap();
    assert!(!release.path().exists());

    // Idempotent
    store.delete(release.path()).unwrap();
    assert_eq!(observer.deleted.lock().len(), 2);
}

#[test]
fn timestamp_slugs_sort_chronologically() {
    use chrono::{TimeZone, Utc};

    let earlier = ReleaseSlug::timestamp(Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap());
    let later = ReleaseSlug::timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    assert!(earlier < later);
}

#[test]
fn prune_keeps_newest_five_by_default() {
    let slugs: Vec<String> = (1..=7).map(|i| format!("r{i}")).collect();
    let pruned = ReleaseStore::prune(&history_of(&slugs), 5);
    let names: Vec<&str> = pruned.iter().map(|r| r.slug().as_str()).collect();
    assert_eq!(names, vec!["r1", "r2"]);
}

proptest! {
    #[test]
    fn history_is_sorted_and_unique(slugs in prop::collection::vec("[a-z0-9]{1,12}", 0..20)) {
        let history = history_of(&slugs);
        let listed: Vec<&str> = history.slugs();

        let expected: Vec<String> = slugs.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        prop_assert_eq!(listed, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn prune_returns_only_the_oldest_excess(
        slugs in prop::collection::btree_set("[a-z0-9]{1,12}", 0..20),
        keep in 1usize..10,
    ) {
        let slugs: Vec<String> = slugs.into_iter().collect();
        let history = history_of(&slugs);
        let pruned = ReleaseStore::prune(&history, keep);

        prop_assert_eq!(pruned.len(), history.len().saturating_sub(keep));
        prop_assert_eq!(pruned.as_slice(), &history.as_slice()[..pruned.len()]);

        let retained = &history.as_slice()[pruned.len()..];
        for release in &pruned {
            prop_assert!(!retained.contains(release));
        }
    }
}
