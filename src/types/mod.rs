// ABOUTME: Validated domain types shared across the crate.
// ABOUTME: Release slugs and hook point names.

mod hook_name;
mod release_slug;

pub use hook_name::{CONVENTIONAL_HOOK_DIR, CONVENTIONAL_HOOK_EXT, HookName};
pub use release_slug::{MAX_SLUG_LEN, ReleaseSlug, ReleaseSlugError, TIMESTAMP_FORMAT};
