//! Read side of published content.
//!
//! The recent-posts listing is materialised into a snapshot stored under
//! [`CacheKey::PublishedContent`]. The snapshot expires exactly when the next
//! scheduled post becomes visible, so readers never miss a post going live,
//! and every write drops it through the [`CacheTrigger`](crate::cache::CacheTrigger).

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::application::error::ContentError;
use crate::application::repos::{AuthorsRepo, ContentRepo, RepoError};
use crate::cache::{CacheKey, CachedValue, ObjectCache};
use crate::domain::archive::ArchivePeriod;
use crate::domain::entities::{CategoryRecord, ContentRecord};
use crate::domain::types::ContentType;
use crate::util::clock::Clock;

#[derive(Debug, Clone, Copy)]
pub struct PublishedSettings {
    /// Size of the cached snapshot and upper bound of every listing.
    pub recent_count: u32,
    pub cache_recent_published: bool,
}

#[derive(Clone)]
pub struct PublishedContentService {
    content: Arc<dyn ContentRepo>,
    authors: Arc<dyn AuthorsRepo>,
    cache: Arc<dyn ObjectCache>,
    clock: Arc<dyn Clock>,
    settings: PublishedSettings,
}

impl PublishedContentService {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        authors: Arc<dyn AuthorsRepo>,
        cache: Arc<dyn ObjectCache>,
        clock: Arc<dyn Clock>,
        settings: PublishedSettings,
    ) -> Self {
        Self {
            content,
            authors,
            cache,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> PublishedSettings {
        self.settings
    }

    /// Up to `limit` published posts, newest first.
    ///
    /// The result never holds more than `recent_count` items, whether or not
    /// the snapshot cache is enabled.
    #[instrument(skip(self))]
    pub async fn get_recent_published(
        &self,
        limit: u32,
    ) -> Result<Vec<ContentRecord>, ContentError> {
        let limit = limit.min(self.settings.recent_count) as usize;

        if !self.settings.cache_recent_published {
            let now = self.clock.now();
            let mut items = self
                .content
                .list_published(now, self.settings.recent_count)
                .await?;
            items.truncate(limit);
            return Ok(items);
        }

        let snapshot = self.snapshot().await?;
        Ok(snapshot.iter().take(limit).cloned().collect())
    }

    /// A published post by slug, served from the snapshot when it holds it.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<ContentRecord, ContentError> {
        if self.settings.cache_recent_published {
            let snapshot = self.snapshot().await?;
            if let Some(item) = snapshot.iter().find(|item| item.slug == slug) {
                return Ok(item.clone());
            }
        }

        let now = self.clock.now();
        self.content
            .find_published_by_slug(ContentType::Post, slug, now)
            .await?
            .ok_or_else(|| ContentError::not_found("post", slug))
    }

    /// Published posts filed under `category`, newest first.
    ///
    /// Always queried directly: the snapshot is truncated and would drop
    /// older posts of the category.
    #[instrument(skip(self, category), fields(category = %category.slug))]
    pub async fn get_by_category(
        &self,
        category: &CategoryRecord,
    ) -> Result<Vec<ContentRecord>, ContentError> {
        let now = self.clock.now();
        Ok(self
            .content
            .list_published_by_category(category.id, now)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_by_author(&self, username: &str) -> Result<Vec<ContentRecord>, ContentError> {
        let author = self
            .authors
            .find_by_username(username)
            .await?
            .ok_or_else(|| ContentError::not_found("author", username))?;

        let now = self.clock.now();
        Ok(self
            .content
            .list_published_by_author(author.id, now)
            .await?)
    }

    #[instrument(skip(self), fields(period = %period))]
    pub async fn get_archive(
        &self,
        period: ArchivePeriod,
    ) -> Result<Vec<ContentRecord>, ContentError> {
        let (start, end) = period
            .bounds()
            .map_err(|_| ContentError::not_found("archive", period.to_string()))?;

        let now = self.clock.now();
        Ok(self
            .content
            .list_published_between(start, end, now)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_page(&self, slug: &str) -> Result<ContentRecord, ContentError> {
        let now = self.clock.now();
        self.content
            .find_published_by_slug(ContentType::Page, slug, now)
            .await?
            .ok_or_else(|| ContentError::not_found("page", slug))
    }

    async fn snapshot(&self) -> Result<Arc<Vec<ContentRecord>>, RepoError> {
        match self.cache.get(&CacheKey::PublishedContent) {
            Some(CachedValue::Content(items)) => Ok(items),
            _ => self.populate().await,
        }
    }

    async fn populate(&self) -> Result<Arc<Vec<ContentRecord>>, RepoError> {
        let now = self.clock.now();
        let items = Arc::new(
            self.content
                .list_published(now, self.settings.recent_count)
                .await?,
        );
        let next_visible = self.content.next_scheduled_after(now).await?;
        let ttl = next_visible.map(|at| ttl_until(at, now));

        debug!(
            items = items.len(),
            next_visible = ?next_visible,
            ttl_ms = ttl.map(|ttl| ttl.as_millis() as u64),
            "published content snapshot computed"
        );

        self.cache.set(
            CacheKey::PublishedContent,
            CachedValue::Content(items.clone()),
            ttl,
        );
        Ok(items)
    }
}

/// Time left until `deadline`, zero when it has already passed.
fn ttl_until(deadline: OffsetDateTime, now: OffsetDateTime) -> Duration {
    Duration::try_from(deadline - now).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::cache::{CacheConfig, MemoryCache};
    use crate::domain::entities::AuthorRecord;
    use crate::domain::publication::is_published;
    use crate::domain::types::ContentStatus;
    use crate::util::clock::ManualClock;

    const START: OffsetDateTime = datetime!(2024-03-01 12:00 UTC);

    fn author() -> AuthorRecord {
        AuthorRecord {
            id: Uuid::nil(),
            username: "writer".to_string(),
            first_name: None,
            created_at: START,
        }
    }

    fn post(slug: &str, status: ContentStatus, scheduled_at: OffsetDateTime) -> ContentRecord {
        ContentRecord {
            id: Uuid::new_v4(),
            title: slug.to_string(),
            slug: slug.to_string(),
            body_markdown: String::new(),
            status,
            content_type: ContentType::Post,
            scheduled_at,
            created_at: START,
            modified_at: START,
            author: author(),
            categories: Vec::new(),
        }
    }

    #[derive(Default)]
    struct StubContent {
        items: Vec<ContentRecord>,
        list_calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentRepo for StubContent {
        async fn list_published(
            &self,
            now: OffsetDateTime,
            limit: u32,
        ) -> Result<Vec<ContentRecord>, RepoError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let mut items: Vec<_> = self
                .items
                .iter()
                .filter(|item| is_published(item, now))
                .cloned()
                .collect();
            items.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
            items.truncate(limit as usize);
            Ok(items)
        }

        async fn next_scheduled_after(
            &self,
            now: OffsetDateTime,
        ) -> Result<Option<OffsetDateTime>, RepoError> {
            Ok(self
                .items
                .iter()
                .filter(|item| item.status == ContentStatus::Published && item.scheduled_at > now)
                .map(|item| item.scheduled_at)
                .min())
        }

        async fn find_published_by_slug(
            &self,
            content_type: ContentType,
            slug: &str,
            now: OffsetDateTime,
        ) -> Result<Option<ContentRecord>, RepoError> {
            Ok(self
                .items
                .iter()
                .find(|item| {
                    item.slug == slug
                        && item.content_type == content_type
                        && is_published(item, now)
                })
                .cloned())
        }

        async fn list_published_by_category(
            &self,
            _category_id: Uuid,
            _now: OffsetDateTime,
        ) -> Result<Vec<ContentRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_published_by_author(
            &self,
            _author_id: Uuid,
            _now: OffsetDateTime,
        ) -> Result<Vec<ContentRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_published_between(
            &self,
            _start: OffsetDateTime,
            _end: OffsetDateTime,
            _now: OffsetDateTime,
        ) -> Result<Vec<ContentRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError> {
            Ok(self.items.iter().find(|item| item.id == id).cloned())
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<ContentRecord>, RepoError> {
            Ok(self.items.iter().find(|item| item.slug == slug).cloned())
        }
    }

    struct StubAuthors;

    #[async_trait]
    impl AuthorsRepo for StubAuthors {
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<AuthorRecord>, RepoError> {
            Ok(None)
        }

        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<AuthorRecord>, RepoError> {
            Ok((username == "writer").then(author))
        }
    }

    fn service(
        items: Vec<ContentRecord>,
        cache_enabled: bool,
    ) -> (PublishedContentService, Arc<StubContent>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let repo = Arc::new(StubContent {
            items,
            ..Default::default()
        });
        let cache = Arc::new(MemoryCache::new(&CacheConfig::default(), clock.clone()));
        let service = PublishedContentService::new(
            repo.clone(),
            Arc::new(StubAuthors),
            cache,
            clock.clone(),
            PublishedSettings {
                recent_count: 20,
                cache_recent_published: cache_enabled,
            },
        );
        (service, repo, clock)
    }

    #[tokio::test]
    async fn snapshot_is_reused_until_next_post_goes_live() {
        let (service, repo, clock) = service(
            vec![
                post("live", ContentStatus::Published, START - time::Duration::hours(1)),
                post("soon", ContentStatus::Published, START + time::Duration::seconds(10)),
            ],
            true,
        );

        let first = service.get_recent_published(20).await.expect("listing");
        assert_eq!(first.len(), 1);
        service.get_recent_published(20).await.expect("listing");
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 1);

        clock.advance(time::Duration::seconds(10));
        let after = service.get_recent_published(20).await.expect("listing");
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].slug, "soon");
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_cache_queries_every_time() {
        let (service, repo, _) = service(
            vec![post("live", ContentStatus::Published, START)],
            false,
        );

        service.get_recent_published(5).await.expect("listing");
        service.get_recent_published(5).await.expect("listing");
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn limit_is_capped_by_recent_count() {
        let items = (0..30)
            .map(|i| {
                post(
                    &format!("post-{i}"),
                    ContentStatus::Published,
                    START - time::Duration::minutes(i),
                )
            })
            .collect();
        let (service, _, _) = service(items, true);

        assert_eq!(service.get_recent_published(3).await.expect("listing").len(), 3);
        assert_eq!(
            service.get_recent_published(100).await.expect("listing").len(),
            20
        );
    }

    #[tokio::test]
    async fn hidden_items_are_not_found_by_slug() {
        let (service, _, _) = service(
            vec![
                post("draft", ContentStatus::Draft, START - time::Duration::days(1)),
                post("future", ContentStatus::Published, START + time::Duration::days(1)),
            ],
            true,
        );

        for slug in ["draft", "future", "missing"] {
            assert!(matches!(
                service.get_by_slug(slug).await,
                Err(ContentError::NotFound { entity: "post", .. })
            ));
        }
    }

    #[tokio::test]
    async fn unknown_author_is_not_found() {
        let (service, _, _) = service(Vec::new(), true);
        assert!(service.get_by_author("writer").await.expect("author").is_empty());
        assert!(matches!(
            service.get_by_author("nobody").await,
            Err(ContentError::NotFound {
                entity: "author",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn impossible_archive_is_not_found() {
        let (service, _, _) = service(Vec::new(), true);
        assert!(matches!(
            service.get_archive(ArchivePeriod::month(2024, 13)).await,
            Err(ContentError::NotFound {
                entity: "archive",
                ..
            })
        ));
    }

    #[test]
    fn ttl_until_never_negative() {
        assert_eq!(
            ttl_until(START, START + time::Duration::seconds(5)),
            Duration::ZERO
        );
        assert_eq!(
            ttl_until(START + time::Duration::seconds(10), START),
            Duration::from_secs(10)
        );
    }
}
