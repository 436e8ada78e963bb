use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::error::ContentError;
use crate::application::repos::{
    AuthorsRepo, CategoriesRepo, ContentRepo, ContentWriteRepo, CreateContentParams,
    UpdateContentParams,
};
use crate::cache::CacheTrigger;
use crate::domain::entities::ContentRecord;
use crate::domain::types::{ContentStatus, ContentType};
use crate::util::clock::Clock;

use super::{duplicate_as_slug_conflict, ensure_non_empty, not_found_or_repo, resolve_slug};

#[derive(Debug, Clone)]
pub struct CreateContentCommand {
    pub title: String,
    /// Used verbatim when present; derived from the title otherwise.
    pub slug: Option<String>,
    pub body_markdown: String,
    pub status: ContentStatus,
    pub content_type: ContentType,
    /// Defaults to the creation time.
    pub scheduled_at: Option<OffsetDateTime>,
    pub author_id: Uuid,
    pub category_ids: Vec<Uuid>,
}

/// Patch over an existing item. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateContentCommand {
    pub id: Uuid,
    pub title: Option<String>,
    pub body_markdown: Option<String>,
    pub status: Option<ContentStatus>,
    pub content_type: Option<ContentType>,
    pub scheduled_at: Option<OffsetDateTime>,
    pub category_ids: Option<Vec<Uuid>>,
}

#[derive(Clone)]
pub struct AdminContentService {
    reader: Arc<dyn ContentRepo>,
    writer: Arc<dyn ContentWriteRepo>,
    authors: Arc<dyn AuthorsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    trigger: CacheTrigger,
    clock: Arc<dyn Clock>,
}

impl AdminContentService {
    pub fn new(
        reader: Arc<dyn ContentRepo>,
        writer: Arc<dyn ContentWriteRepo>,
        authors: Arc<dyn AuthorsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        trigger: CacheTrigger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader,
            writer,
            authors,
            categories,
            trigger,
            clock,
        }
    }

    #[instrument(skip(self, command), fields(title = %command.title))]
    pub async fn create(
        &self,
        command: CreateContentCommand,
    ) -> Result<ContentRecord, ContentError> {
        ensure_non_empty(&command.title, "title")?;

        if self.authors.find_by_id(command.author_id).await?.is_none() {
            return Err(ContentError::validation(format!(
                "unknown author `{}`",
                command.author_id
            )));
        }
        let category_ids = self.checked_categories(command.category_ids).await?;

        let reader = self.reader.clone();
        let slug = resolve_slug(command.slug.as_deref(), &command.title, move |candidate| {
            let reader = reader.clone();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_some())
            }
        })
        .await?;

        let now = self.clock.now();
        let params = CreateContentParams {
            slug: slug.clone(),
            title: command.title,
            body_markdown: command.body_markdown,
            status: command.status,
            content_type: command.content_type,
            scheduled_at: command.scheduled_at.unwrap_or(now),
            author_id: command.author_id,
            category_ids,
            created_at: now,
        };

        let record = self
            .writer
            .create_content(params)
            .await
            .map_err(|err| duplicate_as_slug_conflict(err, &slug))?;

        self.trigger.content_saved(record.id, &record.slug);
        info!(content_id = %record.id, slug = %record.slug, "content created");
        Ok(record)
    }

    #[instrument(skip(self, command), fields(content_id = %command.id))]
    pub async fn update(
        &self,
        command: UpdateContentCommand,
    ) -> Result<ContentRecord, ContentError> {
        let existing = self.load(command.id).await?;

        if let Some(title) = command.title.as_deref() {
            ensure_non_empty(title, "title")?;
        }
        let category_ids = match command.category_ids {
            Some(ids) => self.checked_categories(ids).await?,
            None => existing.categories.iter().map(|category| category.id).collect(),
        };

        let params = UpdateContentParams {
            id: existing.id,
            title: command.title.unwrap_or(existing.title),
            body_markdown: command.body_markdown.unwrap_or(existing.body_markdown),
            status: command.status.unwrap_or(existing.status),
            content_type: command.content_type.unwrap_or(existing.content_type),
            scheduled_at: command.scheduled_at.unwrap_or(existing.scheduled_at),
            category_ids,
            modified_at: self.clock.now(),
        };

        let record = self
            .writer
            .update_content(params)
            .await
            .map_err(|err| not_found_or_repo(err, "content", command.id))?;

        self.trigger.content_saved(record.id, &record.slug);
        info!(content_id = %record.id, "content updated");
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ContentError> {
        let existing = self.load(id).await?;

        self.writer
            .delete_content(id)
            .await
            .map_err(|err| not_found_or_repo(err, "content", id))?;

        self.trigger.content_deleted(existing.id, &existing.slug);
        info!(content_id = %id, "content deleted");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<ContentRecord, ContentError> {
        self.reader
            .find_by_id(id)
            .await?
            .ok_or_else(|| ContentError::not_found("content", id.to_string()))
    }

    async fn checked_categories(&self, ids: Vec<Uuid>) -> Result<Vec<Uuid>, ContentError> {
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            if unique.contains(&id) {
                continue;
            }
            if self.categories.find_by_id(id).await?.is_none() {
                return Err(ContentError::validation(format!("unknown category `{id}`")));
            }
            unique.push(id);
        }
        Ok(unique)
    }
}
