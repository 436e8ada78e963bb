//! Cache trigger service.
//!
//! Write services call into the trigger once their repository call has
//! returned; invalidation happens before the write request completes.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::events::EventKind;
use super::store::ObjectCache;

/// Invalidates cached snapshots after writes.
///
/// ```ignore
/// // After a successful content update:
/// trigger.content_saved(record.id, &record.slug);
/// ```
#[derive(Clone)]
pub struct CacheTrigger {
    cache: Arc<dyn ObjectCache>,
}

impl CacheTrigger {
    pub fn new(cache: Arc<dyn ObjectCache>) -> Self {
        Self { cache }
    }

    /// Drop every entry the event affects.
    pub fn trigger(&self, kind: EventKind) {
        if matches!(kind, EventKind::ClearAll) {
            self.cache.clear();
        } else {
            for key in kind.affected_keys() {
                self.cache.delete(key);
            }
        }
        debug!(event_kind = kind.label(), event = ?kind, "cache invalidated after write");
    }

    pub fn content_saved(&self, content_id: Uuid, slug: &str) {
        self.trigger(EventKind::ContentSaved {
            content_id,
            slug: slug.to_string(),
        });
    }

    pub fn content_deleted(&self, content_id: Uuid, slug: &str) {
        self.trigger(EventKind::ContentDeleted {
            content_id,
            slug: slug.to_string(),
        });
    }

    pub fn category_saved(&self, category_id: Uuid, slug: &str) {
        self.trigger(EventKind::CategorySaved {
            category_id,
            slug: slug.to_string(),
        });
    }

    pub fn category_deleted(&self, category_id: Uuid, slug: &str) {
        self.trigger(EventKind::CategoryDeleted {
            category_id,
            slug: slug.to_string(),
        });
    }

    pub fn clear_all(&self) {
        self.trigger(EventKind::ClearAll);
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::keys::CacheKey;
    use crate::cache::store::{CachedValue, MemoryCache};
    use crate::util::clock::ManualClock;

    fn populated() -> (CacheTrigger, Arc<MemoryCache>) {
        let clock = Arc::new(ManualClock::new(datetime!(2024-01-01 00:00 UTC)));
        let store = Arc::new(MemoryCache::new(&CacheConfig::default(), clock));
        store.set(
            CacheKey::PublishedContent,
            CachedValue::Content(Arc::new(Vec::new())),
            None,
        );
        store.set(
            CacheKey::Categories,
            CachedValue::Categories(Arc::new(Vec::new())),
            None,
        );
        (CacheTrigger::new(store.clone()), store)
    }

    #[test]
    fn content_write_keeps_category_listing() {
        let (trigger, store) = populated();
        trigger.content_saved(Uuid::nil(), "post");

        assert!(store.get(&CacheKey::PublishedContent).is_none());
        assert!(store.get(&CacheKey::Categories).is_some());
    }

    #[test]
    fn category_write_drops_both_snapshots() {
        let (trigger, store) = populated();
        trigger.category_deleted(Uuid::nil(), "rust");

        assert!(store.get(&CacheKey::PublishedContent).is_none());
        assert!(store.get(&CacheKey::Categories).is_none());
    }

    #[test]
    fn clear_all_empties_store() {
        let (trigger, store) = populated();
        trigger.clear_all();
        assert!(store.is_empty());
    }
}
