//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{ContentStatus, ContentType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRecord {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AuthorRecord {
    /// First name when one is set, otherwise the username.
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A post or page together with its author and categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub body_markdown: String,
    pub status: ContentStatus,
    pub content_type: ContentType,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
    pub author: AuthorRecord,
    pub categories: Vec<CategoryRecord>,
}

impl ContentRecord {
    pub fn has_category(&self, category_id: Uuid) -> bool {
        self.categories
            .iter()
            .any(|category| category.id == category_id)
    }
}
