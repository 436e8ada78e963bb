//! Cache key definitions.

use std::fmt;

/// Entries held by the object cache.
///
/// Both keys are unparameterised: each names a single site-wide snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Recent published posts with their authors and categories.
    PublishedContent,
    /// Every category, ordered by name.
    Categories,
}

impl CacheKey {
    pub const ALL: [CacheKey; 2] = [CacheKey::PublishedContent, CacheKey::Categories];

    /// Stable label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::PublishedContent => "published_content",
            CacheKey::Categories => "categories",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_distinct() {
        assert_ne!(
            CacheKey::PublishedContent.as_str(),
            CacheKey::Categories.as_str()
        );
        assert_eq!(CacheKey::Categories.to_string(), "categories");
    }
}
