//! Cache configuration.
//!
//! Controls which snapshots are cached and how many entries the store keeps.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_ENTRY_LIMIT: usize = 16;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache the recent published content snapshot.
    pub cache_recent_published: bool,
    /// Cache the category listing.
    pub cache_categories: bool,
    /// Maximum entries held by the in-memory store.
    pub entry_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_recent_published: true,
            cache_categories: true,
            entry_limit: DEFAULT_ENTRY_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            cache_recent_published: settings.cache_recent_published,
            cache_categories: settings.cache_categories,
            entry_limit: settings.entry_limit,
        }
    }
}

impl CacheConfig {
    /// Returns true if any snapshot is cached.
    pub fn is_enabled(&self) -> bool {
        self.cache_recent_published || self.cache_categories
    }

    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
