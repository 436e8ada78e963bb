use std::sync::Arc;

use time::{Duration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

use djpress::application::admin::{
    CreateAuthorCommand, CreateCategoryCommand, CreateContentCommand, UpdateContentCommand,
};
use djpress::application::error::ContentError;
use djpress::application::repos::{ContentWriteRepo, CreateContentParams};
use djpress::cache::{CacheKey, ObjectCache};
use djpress::domain::archive::ArchivePeriod;
use djpress::domain::types::{ContentStatus, ContentType};
use djpress::infra::bootstrap::{
    ApplicationContext, Repositories, ServiceSettings, build_application_context,
};
use djpress::infra::memory::InMemoryRepositories;
use djpress::util::clock::{Clock, ManualClock};

const START: OffsetDateTime = datetime!(2024-05-10 09:00 UTC);

struct Harness {
    app: ApplicationContext,
    repo: Arc<InMemoryRepositories>,
    clock: Arc<ManualClock>,
    author_id: Uuid,
}

async fn harness_with(settings: ServiceSettings) -> Harness {
    let repo = Arc::new(InMemoryRepositories::new());
    let clock = Arc::new(ManualClock::new(START));
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let app = build_application_context(
        Repositories::from_adapter(repo.clone()),
        shared_clock,
        &settings,
    )
    .expect("context builds");

    let author = app
        .admin
        .authors
        .create(CreateAuthorCommand {
            username: "stuart".to_string(),
            first_name: Some("Stuart".to_string()),
        })
        .await
        .expect("author");

    Harness {
        app,
        repo,
        clock,
        author_id: author.id,
    }
}

async fn harness() -> Harness {
    harness_with(ServiceSettings::default()).await
}

impl Harness {
    fn post(&self, title: &str, scheduled_at: OffsetDateTime) -> CreateContentCommand {
        CreateContentCommand {
            title: title.to_string(),
            slug: None,
            body_markdown: format!("Body of {title}"),
            status: ContentStatus::Published,
            content_type: ContentType::Post,
            scheduled_at: Some(scheduled_at),
            author_id: self.author_id,
            category_ids: Vec::new(),
        }
    }

    async fn publish(&self, title: &str, scheduled_at: OffsetDateTime) -> Uuid {
        self.app
            .admin
            .content
            .create(self.post(title, scheduled_at))
            .await
            .expect("content created")
            .id
    }

    /// Insert behind the services' back so no invalidation happens.
    async fn insert_silently(&self, slug: &str, scheduled_at: OffsetDateTime) {
        self.repo
            .create_content(CreateContentParams {
                slug: slug.to_string(),
                title: slug.to_string(),
                body_markdown: String::new(),
                status: ContentStatus::Published,
                content_type: ContentType::Post,
                scheduled_at,
                author_id: self.author_id,
                category_ids: Vec::new(),
                created_at: START,
            })
            .await
            .expect("silent insert");
    }

    async fn recent_slugs(&self, limit: u32) -> Vec<String> {
        self.app
            .http
            .published
            .get_recent_published(limit)
            .await
            .expect("recent")
            .into_iter()
            .map(|item| item.slug)
            .collect()
    }
}

#[tokio::test]
async fn scheduled_post_appears_once_its_time_arrives() {
    let h = harness().await;
    h.publish("Already out", START - Duration::hours(1)).await;
    h.publish("Coming soon", START + Duration::seconds(10)).await;

    assert_eq!(h.recent_slugs(10).await, vec!["already-out"]);

    h.clock.advance(Duration::seconds(9));
    assert_eq!(h.recent_slugs(10).await, vec!["already-out"]);

    h.clock.advance(Duration::seconds(1));
    assert_eq!(h.recent_slugs(10).await, vec!["coming-soon", "already-out"]);
}

#[tokio::test]
async fn snapshot_is_served_until_a_write_invalidates_it() {
    let h = harness().await;
    h.publish("First", START - Duration::minutes(5)).await;
    assert_eq!(h.recent_slugs(10).await, vec!["first"]);

    h.insert_silently("sneaky", START - Duration::minutes(1)).await;
    assert_eq!(
        h.recent_slugs(10).await,
        vec!["first"],
        "cached snapshot should still be served"
    );

    h.publish("Second", START - Duration::minutes(2)).await;
    assert_eq!(h.recent_slugs(10).await, vec!["sneaky", "second", "first"]);
}

#[tokio::test]
async fn snapshot_without_future_posts_never_expires() {
    let h = harness().await;
    h.publish("Only", START - Duration::days(1)).await;
    assert_eq!(h.recent_slugs(10).await, vec!["only"]);

    h.insert_silently("later-silent", START - Duration::hours(1)).await;
    h.clock.advance(Duration::days(365));
    assert_eq!(h.recent_slugs(10).await, vec!["only"]);
}

#[tokio::test]
async fn listing_respects_limit_and_recent_count() {
    let settings = ServiceSettings {
        recent_count: 3,
        ..ServiceSettings::default()
    };
    let h = harness_with(settings).await;
    for minutes in 1..=5 {
        h.publish(&format!("Post {minutes}"), START - Duration::minutes(minutes))
            .await;
    }

    assert_eq!(h.recent_slugs(2).await, vec!["post-1", "post-2"]);
    assert_eq!(h.recent_slugs(50).await.len(), 3);

    let items = h
        .app
        .http
        .published
        .get_recent_published(50)
        .await
        .expect("recent");
    assert!(
        items
            .windows(2)
            .all(|pair| pair[0].scheduled_at >= pair[1].scheduled_at)
    );
}

#[tokio::test]
async fn limit_is_capped_with_the_cache_disabled() {
    let mut settings = ServiceSettings {
        recent_count: 2,
        ..ServiceSettings::default()
    };
    settings.cache.cache_recent_published = false;
    let h = harness_with(settings).await;
    for minutes in 1..=4 {
        h.publish(&format!("Post {minutes}"), START - Duration::minutes(minutes))
            .await;
    }

    assert_eq!(h.recent_slugs(10).await.len(), 2);
    assert!(h.app.cache.get(&CacheKey::PublishedContent).is_none());
}

#[tokio::test]
async fn older_posts_are_read_past_the_snapshot() {
    let settings = ServiceSettings {
        recent_count: 2,
        ..ServiceSettings::default()
    };
    let h = harness_with(settings).await;
    let category = h
        .app
        .admin
        .categories
        .create(CreateCategoryCommand {
            name: "Archive".to_string(),
            slug: None,
            description: None,
        })
        .await
        .expect("category");

    for minutes in 1..=5 {
        let mut command = h.post(&format!("P {minutes}"), START - Duration::minutes(minutes));
        command.category_ids = vec![category.id];
        h.app.admin.content.create(command).await.expect("post");
    }

    assert_eq!(h.recent_slugs(10).await, vec!["p-1", "p-2"]);

    let oldest = h
        .app
        .http
        .published
        .get_by_slug("p-5")
        .await
        .expect("found by direct query");
    assert_eq!(oldest.slug, "p-5");

    let in_category = h
        .app
        .http
        .published
        .get_by_category(&category)
        .await
        .expect("by category");
    let slugs: Vec<_> = in_category.iter().map(|item| item.slug.as_str()).collect();
    assert_eq!(slugs, vec!["p-1", "p-2", "p-3", "p-4", "p-5"]);
}

#[tokio::test]
async fn drafts_and_future_posts_are_not_found_by_slug() {
    let h = harness().await;
    let mut draft = h.post("Draft", START - Duration::hours(1));
    draft.status = ContentStatus::Draft;
    h.app.admin.content.create(draft).await.expect("draft");
    h.publish("Future", START + Duration::hours(1)).await;
    h.publish("Visible", START).await;

    let published = &h.app.http.published;
    assert_eq!(
        published.get_by_slug("visible").await.expect("visible").slug,
        "visible"
    );
    for slug in ["draft", "future", "missing"] {
        let err = published.get_by_slug(slug).await.expect_err("not visible");
        assert!(matches!(err, ContentError::NotFound { .. }), "{slug}");
    }
}

#[tokio::test]
async fn publishing_a_draft_is_visible_on_next_read() {
    let h = harness().await;
    let mut draft = h.post("Hidden", START - Duration::hours(1));
    draft.status = ContentStatus::Draft;
    let record = h.app.admin.content.create(draft).await.expect("draft");
    assert!(h.recent_slugs(10).await.is_empty());

    h.app
        .admin
        .content
        .update(UpdateContentCommand {
            id: record.id,
            status: Some(ContentStatus::Published),
            ..Default::default()
        })
        .await
        .expect("publish");

    assert_eq!(h.recent_slugs(10).await, vec!["hidden"]);

    h.app.admin.content.delete(record.id).await.expect("delete");
    assert!(h.recent_slugs(10).await.is_empty());
}

#[tokio::test]
async fn slugs_are_derived_unique_or_kept_verbatim() {
    let h = harness().await;
    let first = h.publish("My Post!", START).await;
    let second = h.publish("My Post!", START).await;
    assert_ne!(first, second);

    let slugs = h.recent_slugs(10).await;
    assert!(slugs.contains(&"my-post".to_string()));
    assert!(slugs.contains(&"my-post-2".to_string()));

    let mut explicit = h.post("Whatever", START);
    explicit.slug = Some("Custom_Slug".to_string());
    let record = h.app.admin.content.create(explicit).await.expect("explicit");
    assert_eq!(record.slug, "Custom_Slug");

    let mut clash = h.post("Other", START);
    clash.slug = Some("my-post".to_string());
    let err = h.app.admin.content.create(clash).await.expect_err("taken");
    assert!(matches!(err, ContentError::DuplicateSlug { .. }));

    let err = h
        .app
        .admin
        .content
        .create(h.post("!!!", START))
        .await
        .expect_err("unrepresentable");
    assert!(matches!(err, ContentError::InvalidSlug(_)));
}

#[tokio::test]
async fn category_writes_refresh_both_snapshots() {
    let h = harness().await;
    let categories = &h.app.http.categories;
    assert!(categories.list().await.expect("empty").is_empty());

    let rust = h
        .app
        .admin
        .categories
        .create(CreateCategoryCommand {
            name: "Rust".to_string(),
            slug: None,
            description: None,
        })
        .await
        .expect("category");
    assert_eq!(rust.slug, "rust");

    let listed = categories.list().await.expect("list");
    assert_eq!(listed.len(), 1);

    let mut command = h.post("Tagged", START - Duration::minutes(1));
    command.category_ids = vec![rust.id];
    h.app.admin.content.create(command).await.expect("tagged");

    let in_category = h
        .app
        .http
        .published
        .get_by_category(&rust)
        .await
        .expect("by category");
    assert_eq!(in_category.len(), 1);
    assert_eq!(h.recent_slugs(10).await, vec!["tagged"]);

    h.app
        .admin
        .categories
        .delete(rust.id)
        .await
        .expect("delete category");
    assert!(categories.list().await.expect("list").is_empty());

    let post = h.app.http.published.get_by_slug("tagged").await.expect("post");
    assert!(post.categories.is_empty(), "snapshot was refreshed");
}

#[tokio::test]
async fn author_archive_and_page_reads_honour_publication() {
    let h = harness().await;
    h.publish("May post", datetime!(2024-05-01 08:00 UTC)).await;
    h.publish("April post", datetime!(2024-04-30 23:59 UTC)).await;
    h.publish("Tomorrow", START + Duration::days(1)).await;

    let mut page = h.post("About", START - Duration::days(1));
    page.content_type = ContentType::Page;
    h.app.admin.content.create(page).await.expect("page");

    let published = &h.app.http.published;

    let by_author = published.get_by_author("stuart").await.expect("author");
    let slugs: Vec<_> = by_author.iter().map(|item| item.slug.as_str()).collect();
    assert_eq!(slugs, vec!["may-post", "april-post"]);

    let err = published.get_by_author("nobody").await.expect_err("missing");
    assert!(matches!(err, ContentError::NotFound { .. }));

    let may = published
        .get_archive(ArchivePeriod::month(2024, 5))
        .await
        .expect("archive");
    assert_eq!(may.len(), 1);
    assert_eq!(may[0].slug, "may-post");

    let err = published
        .get_archive(ArchivePeriod::day(2023, 2, 29))
        .await
        .expect_err("invalid date");
    assert!(matches!(err, ContentError::NotFound { .. }));

    assert_eq!(published.get_page("about").await.expect("page").slug, "about");
    assert!(published.get_by_slug("about").await.is_err());
}
