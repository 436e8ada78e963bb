//! djpress cache system
//!
//! Holds materialised snapshots of the published-content listing and the
//! category listing. The published snapshot expires when the next scheduled
//! post goes live; every write drops the snapshots it affects.
//!
//! ```toml
//! [cache]
//! cache_recent_published = true
//! cache_categories = true
//! entry_limit = 16
//! ```

mod config;
mod events;
mod keys;
pub(crate) mod lock;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use events::EventKind;
pub use keys::CacheKey;
pub use store::{CachedValue, MemoryCache, ObjectCache};
pub use trigger::CacheTrigger;
