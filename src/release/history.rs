// ABOUTME: Release and ReleaseHistory value types.
// ABOUTME: History is the sorted view of release directories on disk.

use std::path::{Path, PathBuf};

use crate::types::ReleaseSlug;

/// A release directory, `{deploy_to}/releases/{slug}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    slug: ReleaseSlug,
    path: PathBuf,
}

impl Release {
    pub fn new(releases_dir: &Path, slug: ReleaseSlug) -> Self {
        let path = releases_dir.join(slug.as_str());
        Self { slug, path }
    }

    pub fn slug(&self) -> &ReleaseSlug {
        &self.slug
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// All releases on disk, ascending by slug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseHistory {
    releases: Vec<Release>,
}

impl ReleaseHistory {
    /// Build a history from releases in any order. Duplicate slugs collapse
    /// to one entry.
    pub fn new(mut releases: Vec<Release>) -> Self {
        releases.sort_by(|a, b| a.slug.cmp(&b.slug));
        releases.dedup_by(|a, b| a.slug == b.slug);
        Self { releases }
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn as_slice(&self) -> &[Release] {
        &self.releases
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Release> {
        self.releases.iter()
    }

    /// Most recent release.
    pub fn latest(&self) -> Option<&Release> {
        self.releases.last()
    }

    pub fn position(&self, slug: &ReleaseSlug) -> Option<usize> {
        self.releases.iter().position(|r| &r.slug == slug)
    }

    pub fn get(&self, slug: &ReleaseSlug) -> Option<&Release> {
        self.releases.iter().find(|r| &r.slug == slug)
    }

    pub fn slugs(&self) -> Vec<&str> {
        self.releases.iter().map(|r| r.slug.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ReleaseHistory {
    type Item = &'a Release;
    type IntoIter = std::slice::Iter<'a, Release>;

    fn into_iter(self) -> Self::IntoIter {
        self.releases.iter()
    }
}
