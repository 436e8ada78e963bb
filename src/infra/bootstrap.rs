//! Service wiring shared by the binary and the integration tests.

use std::sync::Arc;

use crate::{
    application::{
        admin::{AdminAuthorService, AdminCategoryService, AdminContentService},
        categories::CategoryService,
        published::{PublishedContentService, PublishedSettings},
        render::{MarkdownRenderer, RenderError},
        repos::{
            AuthorsRepo, AuthorsWriteRepo, CategoriesRepo, CategoriesWriteRepo, ContentRepo,
            ContentWriteRepo, HealthRepo,
        },
        syndication::{FeedSettings, SyndicationService},
    },
    cache::{CacheConfig, CacheTrigger, MemoryCache, ObjectCache},
    config::Settings,
    infra::http::{AdminState, HttpState},
    util::clock::Clock,
};

const DEFAULT_TRUNCATE_TAG: &str = "<!--more-->";

/// Every repository trait object the services need.
#[derive(Clone)]
pub struct Repositories {
    pub content: Arc<dyn ContentRepo>,
    pub content_write: Arc<dyn ContentWriteRepo>,
    pub categories: Arc<dyn CategoriesRepo>,
    pub categories_write: Arc<dyn CategoriesWriteRepo>,
    pub authors: Arc<dyn AuthorsRepo>,
    pub authors_write: Arc<dyn AuthorsWriteRepo>,
    pub health: Arc<dyn HealthRepo>,
}

impl Repositories {
    /// Use one adapter for every trait.
    pub fn from_adapter<R>(adapter: Arc<R>) -> Self
    where
        R: ContentRepo
            + ContentWriteRepo
            + CategoriesRepo
            + CategoriesWriteRepo
            + AuthorsRepo
            + AuthorsWriteRepo
            + HealthRepo
            + 'static,
    {
        Self {
            content: adapter.clone(),
            content_write: adapter.clone(),
            categories: adapter.clone(),
            categories_write: adapter.clone(),
            authors: adapter.clone(),
            authors_write: adapter.clone(),
            health: adapter,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub recent_count: u32,
    pub cache: CacheConfig,
    pub truncate_tag: String,
    pub feed: FeedSettings,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            recent_count: 20,
            cache: CacheConfig::default(),
            truncate_tag: DEFAULT_TRUNCATE_TAG.to_string(),
            feed: FeedSettings {
                blog_title: "djpress".to_string(),
                blog_description: String::new(),
                site_url: "http://localhost:8000/".to_string(),
            },
        }
    }
}

impl From<&Settings> for ServiceSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            recent_count: settings.content.recent_count.get(),
            cache: CacheConfig::from(&settings.cache),
            truncate_tag: settings.content.truncate_tag.clone(),
            feed: FeedSettings {
                blog_title: settings.content.blog_title.clone(),
                blog_description: settings.content.blog_description.clone(),
                site_url: settings.content.site_url.to_string(),
            },
        }
    }
}

/// Router states plus the cache they share.
pub struct ApplicationContext {
    pub http: HttpState,
    pub admin: AdminState,
    pub cache: Arc<MemoryCache>,
}

pub fn build_application_context(
    repos: Repositories,
    clock: Arc<dyn Clock>,
    settings: &ServiceSettings,
) -> Result<ApplicationContext, RenderError> {
    let cache = Arc::new(MemoryCache::new(&settings.cache, clock.clone()));
    let object_cache: Arc<dyn ObjectCache> = cache.clone();
    let trigger = CacheTrigger::new(object_cache.clone());
    let renderer = Arc::new(MarkdownRenderer::new(settings.truncate_tag.clone())?);

    let published = PublishedContentService::new(
        repos.content.clone(),
        repos.authors.clone(),
        object_cache.clone(),
        clock.clone(),
        PublishedSettings {
            recent_count: settings.recent_count,
            cache_recent_published: settings.cache.cache_recent_published,
        },
    );
    let categories = CategoryService::new(
        repos.categories.clone(),
        object_cache,
        settings.cache.cache_categories,
    );
    let syndication =
        SyndicationService::new(published.clone(), renderer.clone(), settings.feed.clone());

    let http = HttpState {
        published,
        categories,
        syndication,
        renderer: renderer.clone(),
        health: repos.health.clone(),
    };

    let admin = AdminState {
        content: AdminContentService::new(
            repos.content.clone(),
            repos.content_write.clone(),
            repos.authors.clone(),
            repos.categories.clone(),
            trigger.clone(),
            clock.clone(),
        ),
        categories: AdminCategoryService::new(
            repos.categories.clone(),
            repos.categories_write.clone(),
            trigger.clone(),
            clock.clone(),
        ),
        authors: AdminAuthorService::new(repos.authors.clone(), repos.authors_write, clock),
        trigger,
        renderer,
        health: repos.health,
    };

    Ok(ApplicationContext { http, admin, cache })
}
