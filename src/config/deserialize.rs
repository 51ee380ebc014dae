// ABOUTME: Custom serde deserializers for config fields.
// ABOUTME: Rejects zero retention and revisions that cannot name a release.

use serde::Deserialize;

use crate::types::ReleaseSlug;

pub fn deserialize_keep_releases<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let keep = usize::deserialize(deserializer)?;
    if keep == 0 {
        return Err(serde::de::Error::custom("keep_releases must be at least 1"));
    }
    Ok(keep)
}

pub fn deserialize_revision<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let revision: Option<String> = Option::deserialize(deserializer)?;
    if let Some(rev) = &revision {
        ReleaseSlug::from_revision(rev).map_err(serde::de::Error::custom)?;
    }
    Ok(revision)
}
