//! Repository traits describing persistence adapters.
//!
//! Read traits expose named queries only. Every `*_published*` query applies
//! the publication predicate (`status = published AND scheduled_at <= now`)
//! and returns items newest first, ties broken by id descending.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{AuthorRecord, CategoryRecord, ContentRecord};
use crate::domain::types::{ContentStatus, ContentType};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateContentParams {
    pub slug: String,
    pub title: String,
    pub body_markdown: String,
    pub status: ContentStatus,
    pub content_type: ContentType,
    pub scheduled_at: OffsetDateTime,
    pub author_id: Uuid,
    pub category_ids: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

/// Full replacement of the mutable columns; the slug is never rewritten.
#[derive(Debug, Clone)]
pub struct UpdateContentParams {
    pub id: Uuid,
    pub title: String,
    pub body_markdown: String,
    pub status: ContentStatus,
    pub content_type: ContentType,
    pub scheduled_at: OffsetDateTime,
    pub category_ids: Vec<Uuid>,
    pub modified_at: OffsetDateTime,
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Published posts visible at `now`, newest first, at most `limit`.
    async fn list_published(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<ContentRecord>, RepoError>;

    /// Earliest `scheduled_at` of a published post not yet visible at `now`.
    async fn next_scheduled_after(
        &self,
        now: OffsetDateTime,
    ) -> Result<Option<OffsetDateTime>, RepoError>;

    async fn find_published_by_slug(
        &self,
        content_type: ContentType,
        slug: &str,
        now: OffsetDateTime,
    ) -> Result<Option<ContentRecord>, RepoError>;

    async fn list_published_by_category(
        &self,
        category_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Vec<ContentRecord>, RepoError>;

    async fn list_published_by_author(
        &self,
        author_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Vec<ContentRecord>, RepoError>;

    /// Published posts with `start <= scheduled_at < end`, visible at `now`.
    async fn list_published_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<Vec<ContentRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ContentRecord>, RepoError>;
}

#[async_trait]
pub trait ContentWriteRepo: Send + Sync {
    async fn create_content(&self, params: CreateContentParams)
    -> Result<ContentRecord, RepoError>;

    async fn update_content(&self, params: UpdateContentParams)
    -> Result<ContentRecord, RepoError>;

    async fn delete_content(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub updated_at: OffsetDateTime,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    /// All categories ordered by name.
    async fn list_all(&self) -> Result<Vec<CategoryRecord>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    /// Removes the category and its content links.
    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateAuthorParams {
    pub username: String,
    pub first_name: Option<String>,
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait AuthorsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthorRecord>, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<AuthorRecord>, RepoError>;
}

#[async_trait]
pub trait AuthorsWriteRepo: Send + Sync {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
