//! Write-side services. Every successful write invalidates the affected
//! cache entries before returning.

mod authors;
mod categories;
mod content;

pub use authors::{AdminAuthorService, CreateAuthorCommand};
pub use categories::{AdminCategoryService, CreateCategoryCommand, UpdateCategoryCommand};
pub use content::{AdminContentService, CreateContentCommand, UpdateContentCommand};

use std::future::Future;

use uuid::Uuid;

use crate::application::error::ContentError;
use crate::application::repos::RepoError;
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async, validate_slug};

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), ContentError> {
    if value.trim().is_empty() {
        return Err(ContentError::validation(format!("`{field}` must not be empty")));
    }
    Ok(())
}

/// Pick the slug for a new record.
///
/// An explicit slug is kept verbatim and must be free; otherwise one is
/// derived from `source` and suffixed until `exists` reports no collision.
async fn resolve_slug<F, Fut>(
    explicit: Option<&str>,
    source: &str,
    exists: F,
) -> Result<String, ContentError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<bool, RepoError>>,
{
    if let Some(slug) = explicit.filter(|slug| !slug.trim().is_empty()) {
        validate_slug(slug)?;
        if exists(slug.to_string()).await? {
            return Err(ContentError::DuplicateSlug {
                slug: slug.to_string(),
            });
        }
        return Ok(slug.to_string());
    }

    generate_unique_slug_async(source, |candidate| {
        let lookup = exists(candidate.to_string());
        async move { lookup.await.map(|taken| !taken) }
    })
    .await
    .map_err(|err| match err {
        SlugAsyncError::Slug(err) => ContentError::InvalidSlug(err),
        SlugAsyncError::Predicate(err) => ContentError::Repo(err),
    })
}

/// A unique-constraint race lost after the pre-check counts as a duplicate slug.
fn duplicate_as_slug_conflict(err: RepoError, slug: &str) -> ContentError {
    match err {
        RepoError::Duplicate { .. } => ContentError::DuplicateSlug {
            slug: slug.to_string(),
        },
        other => ContentError::Repo(other),
    }
}

fn not_found_or_repo(err: RepoError, entity: &'static str, id: Uuid) -> ContentError {
    match err {
        RepoError::NotFound => ContentError::not_found(entity, id.to_string()),
        other => ContentError::Repo(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slug::SlugError;

    async fn taken(candidate: String) -> Result<bool, RepoError> {
        Ok(candidate == "my-post" || candidate == "custom")
    }

    #[tokio::test]
    async fn derived_slug_skips_taken_candidates() {
        let slug = resolve_slug(None, "My Post!", taken).await.expect("slug");
        assert_eq!(slug, "my-post-2");
    }

    #[tokio::test]
    async fn blank_explicit_slug_falls_back_to_title() {
        let slug = resolve_slug(Some("  "), "Fresh Title", taken)
            .await
            .expect("slug");
        assert_eq!(slug, "fresh-title");
    }

    #[tokio::test]
    async fn explicit_slug_is_verbatim_or_conflicts() {
        let slug = resolve_slug(Some("Keep_Me-1"), "ignored", taken)
            .await
            .expect("slug");
        assert_eq!(slug, "Keep_Me-1");

        assert!(matches!(
            resolve_slug(Some("custom"), "ignored", taken).await,
            Err(ContentError::DuplicateSlug { .. })
        ));
        assert!(matches!(
            resolve_slug(Some("bad slug"), "ignored", taken).await,
            Err(ContentError::InvalidSlug(SlugError::Malformed { .. }))
        ));
    }

    #[tokio::test]
    async fn unrepresentable_title_is_invalid_slug() {
        assert!(matches!(
            resolve_slug(None, "!!!", taken).await,
            Err(ContentError::InvalidSlug(SlugError::Unrepresentable { .. }))
        ));
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(ensure_non_empty("  ", "title").is_err());
        assert!(ensure_non_empty("Title", "title").is_ok());
    }
}
