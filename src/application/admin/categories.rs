use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::error::ContentError;
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CreateCategoryParams, UpdateCategoryParams,
};
use crate::cache::CacheTrigger;
use crate::domain::entities::CategoryRecord;
use crate::util::clock::Clock;

use super::{duplicate_as_slug_conflict, ensure_non_empty, not_found_or_repo, resolve_slug};

#[derive(Debug, Clone)]
pub struct CreateCategoryCommand {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryCommand {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct AdminCategoryService {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
    trigger: CacheTrigger,
    clock: Arc<dyn Clock>,
}

impl AdminCategoryService {
    pub fn new(
        reader: Arc<dyn CategoriesRepo>,
        writer: Arc<dyn CategoriesWriteRepo>,
        trigger: CacheTrigger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader,
            writer,
            trigger,
            clock,
        }
    }

    #[instrument(skip(self, command), fields(name = %command.name))]
    pub async fn create(
        &self,
        command: CreateCategoryCommand,
    ) -> Result<CategoryRecord, ContentError> {
        ensure_non_empty(&command.name, "name")?;

        let reader = self.reader.clone();
        let slug = resolve_slug(command.slug.as_deref(), &command.name, move |candidate| {
            let reader = reader.clone();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_some())
            }
        })
        .await?;

        let params = CreateCategoryParams {
            slug: slug.clone(),
            name: command.name,
            description: command.description.unwrap_or_default(),
            created_at: self.clock.now(),
        };

        let record = self
            .writer
            .create_category(params)
            .await
            .map_err(|err| duplicate_as_slug_conflict(err, &slug))?;

        self.trigger.category_saved(record.id, &record.slug);
        info!(category_id = %record.id, slug = %record.slug, "category created");
        Ok(record)
    }

    #[instrument(skip(self, command), fields(category_id = %command.id))]
    pub async fn update(
        &self,
        command: UpdateCategoryCommand,
    ) -> Result<CategoryRecord, ContentError> {
        let existing = self.load(command.id).await?;

        if let Some(name) = command.name.as_deref() {
            ensure_non_empty(name, "name")?;
        }

        let params = UpdateCategoryParams {
            id: existing.id,
            name: command.name.unwrap_or(existing.name),
            description: command.description.unwrap_or(existing.description),
            updated_at: self.clock.now(),
        };

        let record = self
            .writer
            .update_category(params)
            .await
            .map_err(|err| not_found_or_repo(err, "category", command.id))?;

        self.trigger.category_saved(record.id, &record.slug);
        info!(category_id = %record.id, "category updated");
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ContentError> {
        let existing = self.load(id).await?;

        self.writer
            .delete_category(id)
            .await
            .map_err(|err| not_found_or_repo(err, "category", id))?;

        self.trigger.category_deleted(existing.id, &existing.slug);
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<CategoryRecord, ContentError> {
        self.reader
            .find_by_id(id)
            .await?
            .ok_or_else(|| ContentError::not_found("category", id.to_string()))
    }
}
