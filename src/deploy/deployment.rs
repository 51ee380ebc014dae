// ABOUTME: Generic deployment struct parameterized by pipeline phase.
// ABOUTME: The phase type decides which pipeline step can run next.

use crate::release::Release;
use crate::types::ReleaseSlug;

use super::state::{Completed, Initialized};

/// A release moving through the deploy pipeline.
///
/// `S` is a phase marker from [`super::state`]; each step consumes the
/// deployment and returns it in the next phase, so steps cannot be skipped
/// or reordered.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) release: Release,
    pub(crate) state: S,
}

impl Deployment<Initialized> {
    pub fn new(release: Release) -> Self {
        Deployment {
            release,
            state: Initialized,
        }
    }
}

impl<S> Deployment<S> {
    pub fn release(&self) -> &Release {
        &self.release
    }

    pub fn slug(&self) -> &ReleaseSlug {
        self.release.slug()
    }
}

impl Deployment<Completed> {
    /// Releases deleted by retention.
    pub fn pruned(&self) -> &[Release] {
        &self.state.pruned
    }

    pub fn finish(self) -> (Release, Vec<Release>) {
        (self.release, self.state.pruned)
    }
}
