//! Cache configuration.

use std::time::Duration;

const DEFAULT_POST_TTL_SECS: u64 = 60 * 60 * 4;
const DEFAULT_SLUG_EXISTS_TTL_SECS: u64 = 60 * 60;
const DEFAULT_DRAFT_TTL_SECS: u64 = 60 * 60 * 24 * 7;

/// Expiry policy for cached entries. The post list has no TTL and lives
/// until a write invalidates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of a post detail snapshot.
    pub post_ttl: Duration,
    /// Lifetime of a slug occupancy entry.
    pub slug_exists_ttl: Duration,
    /// Lifetime of an editor draft.
    pub draft_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            post_ttl: Duration::from_secs(DEFAULT_POST_TTL_SECS),
            slug_exists_ttl: Duration::from_secs(DEFAULT_SLUG_EXISTS_TTL_SECS),
            draft_ttl: Duration::from_secs(DEFAULT_DRAFT_TTL_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            post_ttl: settings.post_ttl,
            slug_exists_ttl: settings.slug_exists_ttl,
            draft_ttl: settings.draft_ttl,
        }
    }
}
