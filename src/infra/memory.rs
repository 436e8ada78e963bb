//! Process-local repository adapter.
//!
//! Used when no database URL is configured and by the service tests. It
//! enforces the same uniqueness and reference rules as the Postgres schema
//! so both adapters report the same [`RepoError`] variants.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    AuthorsRepo, AuthorsWriteRepo, CategoriesRepo, CategoriesWriteRepo, ContentRepo,
    ContentWriteRepo, CreateAuthorParams, CreateCategoryParams, CreateContentParams, HealthRepo,
    RepoError, UpdateCategoryParams, UpdateContentParams,
};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{AuthorRecord, CategoryRecord, ContentRecord};
use crate::domain::publication::is_published;
use crate::domain::types::{ContentStatus, ContentType};

const SOURCE: &str = "infra::memory";

#[derive(Debug, Clone)]
struct StoredContent {
    id: Uuid,
    title: String,
    slug: String,
    body_markdown: String,
    status: ContentStatus,
    content_type: ContentType,
    scheduled_at: OffsetDateTime,
    author_id: Uuid,
    created_at: OffsetDateTime,
    modified_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct MemoryState {
    authors: HashMap<Uuid, AuthorRecord>,
    categories: HashMap<Uuid, CategoryRecord>,
    content: HashMap<Uuid, StoredContent>,
    /// `(content_id, category_id)` pairs.
    links: BTreeSet<(Uuid, Uuid)>,
}

impl MemoryState {
    fn hydrate(&self, stored: &StoredContent) -> Result<ContentRecord, RepoError> {
        let author = self
            .authors
            .get(&stored.author_id)
            .cloned()
            .ok_or_else(|| RepoError::Integrity {
                message: format!("content {} references a missing author", stored.id),
            })?;

        let mut categories: Vec<CategoryRecord> = self
            .links
            .range((stored.id, Uuid::nil())..=(stored.id, Uuid::max()))
            .filter_map(|(_, category_id)| self.categories.get(category_id).cloned())
            .collect();
        sort_categories(&mut categories);

        Ok(ContentRecord {
            id: stored.id,
            title: stored.title.clone(),
            slug: stored.slug.clone(),
            body_markdown: stored.body_markdown.clone(),
            status: stored.status,
            content_type: stored.content_type,
            scheduled_at: stored.scheduled_at,
            created_at: stored.created_at,
            modified_at: stored.modified_at,
            author,
            categories,
        })
    }

    /// Published posts visible at `now` that satisfy `filter`, newest first.
    fn published_posts<F>(&self, now: OffsetDateTime, filter: F) -> Result<Vec<ContentRecord>, RepoError>
    where
        F: Fn(&StoredContent) -> bool,
    {
        let mut items = Vec::new();
        for stored in self.content.values() {
            if stored.content_type != ContentType::Post || !filter(stored) {
                continue;
            }
            let record = self.hydrate(stored)?;
            if is_published(&record, now) {
                items.push(record);
            }
        }
        items.sort_by(|a, b| {
            b.scheduled_at
                .cmp(&a.scheduled_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(items)
    }

    fn check_categories(&self, category_ids: &[Uuid]) -> Result<(), RepoError> {
        match category_ids
            .iter()
            .find(|id| !self.categories.contains_key(id))
        {
            Some(missing) => Err(RepoError::InvalidInput {
                message: format!("category {missing} does not exist"),
            }),
            None => Ok(()),
        }
    }

    fn replace_links(&mut self, content_id: Uuid, category_ids: &[Uuid]) {
        self.links.retain(|(linked, _)| *linked != content_id);
        for category_id in category_ids {
            self.links.insert((content_id, *category_id));
        }
    }
}

fn sort_categories(categories: &mut [CategoryRecord]) {
    categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));
}

fn duplicate(constraint: &str) -> RepoError {
    RepoError::Duplicate {
        constraint: constraint.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRepositories {
    state: RwLock<MemoryState>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentRepo for InMemoryRepositories {
    async fn list_published(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_published");
        let mut items = state.published_posts(now, |_| true)?;
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn next_scheduled_after(
        &self,
        now: OffsetDateTime,
    ) -> Result<Option<OffsetDateTime>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "next_scheduled_after");
        Ok(state
            .content
            .values()
            .filter(|stored| {
                stored.status == ContentStatus::Published
                    && stored.content_type == ContentType::Post
                    && stored.scheduled_at > now
            })
            .map(|stored| stored.scheduled_at)
            .min())
    }

    async fn find_published_by_slug(
        &self,
        content_type: ContentType,
        slug: &str,
        now: OffsetDateTime,
    ) -> Result<Option<ContentRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "find_published_by_slug");
        let Some(stored) = state
            .content
            .values()
            .find(|stored| stored.slug == slug && stored.content_type == content_type)
        else {
            return Ok(None);
        };

        let record = state.hydrate(stored)?;
        Ok(is_published(&record, now).then_some(record))
    }

    async fn list_published_by_category(
        &self,
        category_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_published_by_category");
        state.published_posts(now, |stored| {
            state.links.contains(&(stored.id, category_id))
        })
    }

    async fn list_published_by_author(
        &self,
        author_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_published_by_author");
        state.published_posts(now, |stored| stored.author_id == author_id)
    }

    async fn list_published_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_published_between");
        state.published_posts(now, |stored| {
            stored.scheduled_at >= start && stored.scheduled_at < end
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "find_content_by_id");
        state
            .content
            .get(&id)
            .map(|stored| state.hydrate(stored))
            .transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ContentRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "find_content_by_slug");
        state
            .content
            .values()
            .find(|stored| stored.slug == slug)
            .map(|stored| state.hydrate(stored))
            .transpose()
    }
}

#[async_trait]
impl ContentWriteRepo for InMemoryRepositories {
    async fn create_content(
        &self,
        params: CreateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "create_content");

        if state.content.values().any(|stored| stored.slug == params.slug) {
            return Err(duplicate("content_slug_key"));
        }
        if !state.authors.contains_key(&params.author_id) {
            return Err(RepoError::InvalidInput {
                message: format!("author {} does not exist", params.author_id),
            });
        }
        state.check_categories(&params.category_ids)?;

        let stored = StoredContent {
            id: Uuid::new_v4(),
            title: params.title,
            slug: params.slug,
            body_markdown: params.body_markdown,
            status: params.status,
            content_type: params.content_type,
            scheduled_at: params.scheduled_at,
            author_id: params.author_id,
            created_at: params.created_at,
            modified_at: params.created_at,
        };
        let id = stored.id;
        state.content.insert(id, stored.clone());
        state.replace_links(id, &params.category_ids);

        state.hydrate(&stored)
    }

    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "update_content");
        state.check_categories(&params.category_ids)?;

        let stored = state
            .content
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        stored.title = params.title;
        stored.body_markdown = params.body_markdown;
        stored.status = params.status;
        stored.content_type = params.content_type;
        stored.scheduled_at = params.scheduled_at;
        stored.modified_at = params.modified_at;
        let stored = stored.clone();

        state.replace_links(params.id, &params.category_ids);
        state.hydrate(&stored)
    }

    async fn delete_content(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "delete_content");
        state.content.remove(&id).ok_or(RepoError::NotFound)?;
        state.links.retain(|(content_id, _)| *content_id != id);
        Ok(())
    }
}

#[async_trait]
impl CategoriesRepo for InMemoryRepositories {
    async fn list_all(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_categories");
        let mut items: Vec<CategoryRecord> = state.categories.values().cloned().collect();
        sort_categories(&mut items);
        Ok(items)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "find_category_by_id");
        Ok(state.categories.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "find_category_by_slug");
        Ok(state
            .categories
            .values()
            .find(|category| category.slug == slug)
            .cloned())
    }
}

#[async_trait]
impl CategoriesWriteRepo for InMemoryRepositories {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "create_category");
        if state
            .categories
            .values()
            .any(|category| category.slug == params.slug)
        {
            return Err(duplicate("categories_slug_key"));
        }

        let record = CategoryRecord {
            id: Uuid::new_v4(),
            name: params.name,
            slug: params.slug,
            description: params.description,
            created_at: params.created_at,
            updated_at: params.created_at,
        };
        state.categories.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "update_category");
        let record = state
            .categories
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        record.name = params.name;
        record.description = params.description;
        record.updated_at = params.updated_at;
        Ok(record.clone())
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "delete_category");
        state.categories.remove(&id).ok_or(RepoError::NotFound)?;
        state.links.retain(|(_, category_id)| *category_id != id);
        Ok(())
    }
}

#[async_trait]
impl AuthorsRepo for InMemoryRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthorRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "find_author_by_id");
        Ok(state.authors.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AuthorRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "find_author_by_username");
        Ok(state
            .authors
            .values()
            .find(|author| author.username == username)
            .cloned())
    }
}

#[async_trait]
impl AuthorsWriteRepo for InMemoryRepositories {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "create_author");
        if state
            .authors
            .values()
            .any(|author| author.username == params.username)
        {
            return Err(duplicate("authors_username_key"));
        }

        let record = AuthorRecord {
            id: Uuid::new_v4(),
            username: params.username,
            first_name: params.first_name,
            created_at: params.created_at,
        };
        state.authors.insert(record.id, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl HealthRepo for InMemoryRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}
