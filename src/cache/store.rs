//! Object cache storage.
//!
//! [`ObjectCache`] is the key-value port the services talk to; [`MemoryCache`]
//! is the in-process implementation backed by an LRU map.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use lru::LruCache;
use metrics::counter;
use time::OffsetDateTime;
use tracing::debug;

use crate::domain::entities::{CategoryRecord, ContentRecord};
use crate::util::clock::Clock;

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// A materialised query result stored in the cache.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Content(Arc<Vec<ContentRecord>>),
    Categories(Arc<Vec<CategoryRecord>>),
}

impl CachedValue {
    pub fn len(&self) -> usize {
        match self {
            CachedValue::Content(items) => items.len(),
            CachedValue::Categories(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Key-value cache with optional per-entry time-to-live.
///
/// Operations are synchronous and infallible; a broken cache degrades to
/// misses rather than failing reads.
pub trait ObjectCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CachedValue>;

    /// Store `value`, replacing any previous entry. `None` means no expiry.
    fn set(&self, key: CacheKey, value: CachedValue, ttl: Option<Duration>);

    fn delete(&self, key: &CacheKey);

    fn clear(&self);
}

struct Entry {
    value: CachedValue,
    expires_at: Option<OffsetDateTime>,
}

impl Entry {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// In-process LRU cache that reads time from an injected clock.
pub struct MemoryCache {
    entries: RwLock<LruCache<CacheKey, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.entry_limit_non_zero())),
            clock,
        }
    }

    /// Number of stored entries, expired ones included until next read.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");

        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                counter!("djpress_cache_hit_total", "key" => key.as_str()).increment(1);
                debug!(key = key.as_str(), items = entry.value.len(), "cache hit");
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
        }
        counter!("djpress_cache_miss_total", "key" => key.as_str()).increment(1);
        debug!(key = key.as_str(), expired, "cache miss");
        None
    }

    fn set(&self, key: CacheKey, value: CachedValue, ttl: Option<Duration>) {
        let now = self.clock.now();
        // A TTL too large to represent is treated as no expiry.
        let expires_at = ttl.and_then(|ttl| {
            time::Duration::try_from(ttl)
                .ok()
                .and_then(|ttl| now.checked_add(ttl))
        });

        debug!(
            key = key.as_str(),
            items = value.len(),
            ttl_ms = ttl.map(|ttl| ttl.as_millis() as u64),
            "cache populated"
        );
        counter!("djpress_cache_store_total", "key" => key.as_str()).increment(1);

        rw_write(&self.entries, SOURCE, "set").put(key, Entry { value, expires_at });
    }

    fn delete(&self, key: &CacheKey) {
        let removed = rw_write(&self.entries, SOURCE, "delete").pop(key).is_some();
        counter!("djpress_cache_invalidate_total", "key" => key.as_str()).increment(1);
        debug!(key = key.as_str(), removed, "cache invalidated");
    }

    fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
        for key in CacheKey::ALL {
            counter!("djpress_cache_invalidate_total", "key" => key.as_str()).increment(1);
        }
        debug!("cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use time::macros::datetime;

    use super::*;
    use crate::util::clock::ManualClock;

    fn sample_categories() -> CachedValue {
        let at = datetime!(2024-01-01 00:00 UTC);
        CachedValue::Categories(Arc::new(vec![CategoryRecord {
            id: uuid::Uuid::new_v4(),
            name: "Rust".to_string(),
            slug: "rust".to_string(),
            description: String::new(),
            created_at: at,
            updated_at: at,
        }]))
    }

    fn store_with_clock() -> (MemoryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(datetime!(2024-01-01 00:00 UTC)));
        let store = MemoryCache::new(&CacheConfig::default(), clock.clone());
        (store, clock)
    }

    #[test]
    fn roundtrip_and_delete() {
        let (store, _) = store_with_clock();
        assert!(store.get(&CacheKey::Categories).is_none());

        store.set(CacheKey::Categories, sample_categories(), None);
        let cached = store.get(&CacheKey::Categories).expect("cached");
        assert_eq!(cached.len(), 1);

        store.delete(&CacheKey::Categories);
        assert!(store.get(&CacheKey::Categories).is_none());
    }

    #[test]
    fn entry_expires_exactly_at_deadline() {
        let (store, clock) = store_with_clock();
        store.set(
            CacheKey::Categories,
            sample_categories(),
            Some(Duration::from_secs(10)),
        );

        clock.advance(time::Duration::seconds(9));
        assert!(store.get(&CacheKey::Categories).is_some());

        clock.advance(time::Duration::seconds(1));
        assert!(store.get(&CacheKey::Categories).is_none());
        assert!(store.is_empty(), "expired entry is evicted on read");
    }

    #[test]
    fn entries_without_ttl_never_expire() {
        let (store, clock) = store_with_clock();
        store.set(CacheKey::Categories, sample_categories(), None);
        clock.advance(time::Duration::days(3650));
        assert!(store.get(&CacheKey::Categories).is_some());
    }

    #[test]
    fn lru_bound_evicts_least_recent() {
        let clock = Arc::new(ManualClock::new(datetime!(2024-01-01 00:00 UTC)));
        let config = CacheConfig {
            entry_limit: 1,
            ..Default::default()
        };
        let store = MemoryCache::new(&config, clock);

        store.set(CacheKey::Categories, sample_categories(), None);
        store.set(
            CacheKey::PublishedContent,
            CachedValue::Content(Arc::new(Vec::new())),
            None,
        );

        assert!(store.get(&CacheKey::Categories).is_none());
        assert!(store.get(&CacheKey::PublishedContent).is_some());
    }

    #[test]
    fn clear_drops_everything() {
        let (store, _) = store_with_clock();
        store.set(CacheKey::Categories, sample_categories(), None);
        store.set(
            CacheKey::PublishedContent,
            CachedValue::Content(Arc::new(Vec::new())),
            None,
        );
        store.clear();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let (store, _) = store_with_clock();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.set(CacheKey::Categories, sample_categories(), None);
        assert!(store.get(&CacheKey::Categories).is_some());
    }
}
