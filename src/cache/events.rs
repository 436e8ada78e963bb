//! Write events that invalidate cached snapshots.

use uuid::Uuid;

use super::keys::CacheKey;

/// Types of writes that trigger invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A post or page was created or updated.
    ContentSaved { content_id: Uuid, slug: String },
    /// A post or page was deleted.
    ContentDeleted { content_id: Uuid, slug: String },
    /// A category was created or updated.
    CategorySaved { category_id: Uuid, slug: String },
    /// A category was deleted.
    CategoryDeleted { category_id: Uuid, slug: String },
    /// An operator asked for every snapshot to be dropped.
    ClearAll,
}

impl EventKind {
    /// Cache entries that no longer reflect the datastore after this event.
    ///
    /// Content snapshots embed category names and slugs, so category writes
    /// drop both entries.
    pub fn affected_keys(&self) -> &'static [CacheKey] {
        match self {
            EventKind::ContentSaved { .. } | EventKind::ContentDeleted { .. } => {
                &[CacheKey::PublishedContent]
            }
            EventKind::CategorySaved { .. }
            | EventKind::CategoryDeleted { .. }
            | EventKind::ClearAll => &CacheKey::ALL,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventKind::ContentSaved { .. } => "content_saved",
            EventKind::ContentDeleted { .. } => "content_deleted",
            EventKind::CategorySaved { .. } => "category_saved",
            EventKind::CategoryDeleted { .. } => "category_deleted",
            EventKind::ClearAll => "clear_all",
        }
    }
}
