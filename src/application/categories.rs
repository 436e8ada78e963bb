use std::sync::Arc;

use tracing::instrument;

use crate::application::error::ContentError;
use crate::application::repos::CategoriesRepo;
use crate::cache::{CacheKey, CachedValue, ObjectCache};
use crate::domain::entities::CategoryRecord;

/// Category reads. The full listing is cached without expiry.
#[derive(Clone)]
pub struct CategoryService {
    repo: Arc<dyn CategoriesRepo>,
    cache: Arc<dyn ObjectCache>,
    cache_enabled: bool,
}

impl CategoryService {
    pub fn new(
        repo: Arc<dyn CategoriesRepo>,
        cache: Arc<dyn ObjectCache>,
        cache_enabled: bool,
    ) -> Self {
        Self {
            repo,
            cache,
            cache_enabled,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CategoryRecord>, ContentError> {
        if !self.cache_enabled {
            return Ok(self.repo.list_all().await?);
        }

        if let Some(CachedValue::Categories(items)) = self.cache.get(&CacheKey::Categories) {
            return Ok(items.as_ref().clone());
        }

        let items = Arc::new(self.repo.list_all().await?);
        self.cache
            .set(CacheKey::Categories, CachedValue::Categories(items.clone()), None);
        Ok(items.as_ref().clone())
    }

    #[instrument(skip(self))]
    pub async fn find_by_slug(&self, slug: &str) -> Result<CategoryRecord, ContentError> {
        self.repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| ContentError::not_found("category", slug))
    }
}
