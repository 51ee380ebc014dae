// ABOUTME: Filesystem-safe release identifiers.
// ABOUTME: Slugs name release directories and sort lexicographically.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Maximum slug length in bytes.
pub const MAX_SLUG_LEN: usize = 128;

/// Timestamp format used for revision-less releases. Fixed width, so
/// lexicographic order matches chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReleaseSlugError {
    #[error("release slug cannot be empty")]
    Empty,

    #[error("release slug exceeds maximum length of {MAX_SLUG_LEN} bytes")]
    TooLong,

    #[error("release slug cannot start with '.'")]
    StartsWithDot,

    #[error("invalid character in release slug: '{0}'")]
    InvalidChar(char),
}

/// Name of a release directory under `releases/`.
///
/// Releases are ordered by comparing slugs as strings. Callers pick slugs
/// whose lexicographic order is the order they were deployed in, e.g.
/// [`ReleaseSlug::timestamp`] or zero-padded sequence numbers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseSlug(String);

fn is_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

impl ReleaseSlug {
    pub fn new(value: &str) -> Result<Self, ReleaseSlugError> {
        if value.is_empty() {
            return Err(ReleaseSlugError::Empty);
        }

        if value.len() > MAX_SLUG_LEN {
            return Err(ReleaseSlugError::TooLong);
        }

        if value.starts_with('.') {
            return Err(ReleaseSlugError::StartsWithDot);
        }

        if let Some(c) = value.chars().find(|c| !is_slug_char(*c)) {
            return Err(ReleaseSlugError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    /// Derive a slug from a revision string (tag, sha, branch).
    ///
    /// Characters that are not path-safe become `-`, so `origin/main`
    /// maps to `origin-main`. The mapping is deterministic.
    pub fn from_revision(revision: &str) -> Result<Self, ReleaseSlugError> {
        let sanitized: String = revision
            .trim()
            .chars()
            .map(|c| if is_slug_char(c) { c } else { '-' })
            .collect();
        Self::new(&sanitized)
    }

    /// Slug for a release that has no revision, e.g. `20240131235959`.
    pub fn timestamp(now: DateTime<Utc>) -> Self {
        Self(now.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
