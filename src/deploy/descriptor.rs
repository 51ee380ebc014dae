// ABOUTME: Per-invocation deployment descriptor and its value types.
// ABOUTME: Holds paths, link maps, hooks, restart target, ownership, and environment.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::exec::Ownership;
use crate::hooks::{EmbeddedScript, HookScope, HookSet};
use crate::release::DEFAULT_KEEP_RELEASES;
use crate::types::{ReleaseSlug, ReleaseSlugError};

/// Shared-path to release-path symlinks, in declaration order.
///
/// Each entry maps `{shared_path}/{source}` to a link at `{release}/{dest}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkMap(Vec<(PathBuf, PathBuf)>);

impl LinkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        self.insert(source, dest);
        self
    }

    /// Add a link. A repeated source replaces the earlier destination.
    pub fn insert(&mut self, source: impl Into<PathBuf>, dest: impl Into<PathBuf>) {
        let source = source.into();
        let dest = dest.into();
        match self.0.iter_mut().find(|(s, _)| *s == source) {
            Some(entry) => entry.1 = dest,
            None => self.0.push((source, dest)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.0.iter().map(|(s, d)| (s.as_path(), d.as_path()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for LinkMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LinkMapVisitor;

        impl<'de> Visitor<'de> for LinkMapVisitor {
            type Value = LinkMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of shared paths to release paths")
            }

            fn visit_unit<E>(self) -> Result<LinkMap, E> {
                Ok(LinkMap::new())
            }

            fn visit_map<A>(self, mut map: A) -> Result<LinkMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut links = LinkMap::new();
                while let Some((source, dest)) = map.next_entry::<PathBuf, PathBuf>()? {
                    links.insert(source, dest);
                }
                Ok(links)
            }
        }

        deserializer.deserialize_map(LinkMapVisitor)
    }
}

/// How the application is restarted after cutover.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RestartTarget {
    /// Shell command run with cwd = current path.
    Command(String),
    /// Embedded script run by the hook evaluator.
    Script(EmbeddedScript),
}

/// Immutable configuration for one deploy, force deploy, or rollback.
#[derive(Debug, Clone)]
pub struct DeploymentDescriptor {
    pub deploy_to: PathBuf,
    pub shared_path: PathBuf,
    pub current_path: PathBuf,
    /// Requested revision. Also names the release and, for rollback, the
    /// explicit target.
    pub revision: Option<String>,
    pub keep_releases: usize,
    pub symlink_before_migrate: LinkMap,
    pub symlinks: LinkMap,
    pub purge_before_symlink: Vec<PathBuf>,
    pub create_dirs_before_symlink: Vec<PathBuf>,
    pub migrate: bool,
    pub migration_command: Option<String>,
    pub restart: Option<RestartTarget>,
    pub hooks: HookSet,
    /// Use the source's clean export instead of an incremental sync.
    pub force_export: bool,
    pub ownership: Ownership,
    pub environment: HashMap<String, String>,
}

impl DeploymentDescriptor {
    /// Descriptor with `shared/` and `current` under `deploy_to`, default
    /// retention, and nothing else configured.
    pub fn new(deploy_to: impl Into<PathBuf>) -> Self {
        let deploy_to = deploy_to.into();
        Self {
            shared_path: deploy_to.join("shared"),
            current_path: deploy_to.join("current"),
            deploy_to,
            revision: None,
            keep_releases: DEFAULT_KEEP_RELEASES,
            symlink_before_migrate: LinkMap::new(),
            symlinks: LinkMap::new(),
            purge_before_symlink: Vec::new(),
            create_dirs_before_symlink: Vec::new(),
            migrate: false,
            migration_command: None,
            restart: None,
            hooks: HookSet::default(),
            force_export: false,
            ownership: Ownership::default(),
            environment: HashMap::new(),
        }
    }

    /// Slug explicitly requested through the revision, if any.
    pub fn requested_slug(&self) -> Result<Option<ReleaseSlug>, ReleaseSlugError> {
        self.revision
            .as_deref()
            .map(ReleaseSlug::from_revision)
            .transpose()
    }

    /// Slug for the release this deploy produces: the revision's slug, or a
    /// timestamp when no revision is set.
    pub fn release_slug(&self, now: DateTime<Utc>) -> Result<ReleaseSlug, ReleaseSlugError> {
        Ok(self
            .requested_slug()?
            .unwrap_or_else(|| ReleaseSlug::timestamp(now)))
    }

    pub fn hook_scope(&self) -> HookScope {
        HookScope {
            deploy_to: self.deploy_to.clone(),
            current_path: self.current_path.clone(),
            shared_path: self.shared_path.clone(),
            environment: self.environment.clone(),
            user: self.ownership.user.clone(),
            group: self.ownership.group.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_derives_shared_and_current() {
        let descriptor = DeploymentDescriptor::new("/srv/app");
        assert_eq!(descriptor.shared_path, PathBuf::from("/srv/app/shared"));
        assert_eq!(descriptor.current_path, PathBuf::from("/srv/app/current"));
        assert_eq!(descriptor.keep_releases, 5);
    }

    #[test]
    fn release_slug_prefers_revision() {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let mut descriptor = DeploymentDescriptor::new("/srv/app");
        assert_eq!(descriptor.release_slug(now).unwrap().as_str(), "20240506070809");

        descriptor.revision = Some("v2.0.1".to_string());
        assert_eq!(descriptor.release_slug(now).unwrap().as_str(), "v2.0.1");
    }

    #[test]
    fn link_map_keeps_document_order() {
        let links: LinkMap =
            serde_yaml::from_str("system: public/system\npids: tmp/pids\nlog: log\n").unwrap();
        let sources: Vec<_> = links.iter().map(|(s, _)| s.to_path_buf()).collect();
        assert_eq!(
            sources,
            vec![
                PathBuf::from("system"),
                PathBuf::from("pids"),
                PathBuf::from("log")
            ]
        );
    }

    #[test]
    fn link_map_insert_replaces_existing_source() {
        let links = LinkMap::new().with("log", "log").with("log", "var/log");
        assert_eq!(links.len(), 1);
        assert_eq!(
            links.iter().next(),
            Some((Path::new("log"), Path::new("var/log")))
        );
    }

    #[test]
    fn restart_target_shapes() {
        let command: RestartTarget = serde_yaml::from_str("touch tmp/restart.txt").unwrap();
        assert_eq!(
            command,
            RestartTarget::Command("touch tmp/restart.txt".to_string())
        );

        let script: RestartTarget = serde_yaml::from_str("script: Process.kill('HUP', 1)").unwrap();
        assert!(matches!(script, RestartTarget::Script(_)));
    }
}
