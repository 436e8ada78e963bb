//! JSON views shared by the public and admin routers.

use axum::http::StatusCode;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::render::{MarkdownRenderer, RenderError};
use crate::domain::entities::{AuthorRecord, CategoryRecord, ContentRecord};
use crate::domain::types::{ContentStatus, ContentType};

#[derive(Debug, Serialize)]
pub struct AuthorView {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

impl From<&AuthorRecord> for AuthorView {
    fn from(author: &AuthorRecord) -> Self {
        Self {
            id: author.id,
            username: author.username.clone(),
            display_name: author.display_name().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl From<&CategoryRecord> for CategoryView {
    fn from(category: &CategoryRecord) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContentView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub status: ContentStatus,
    pub content_type: ContentType,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
    pub author: AuthorView,
    pub categories: Vec<CategoryView>,
    pub html: String,
    pub summary_html: String,
    pub is_truncated: bool,
}

impl ContentView {
    pub fn render(item: &ContentRecord, renderer: &MarkdownRenderer) -> Result<Self, HttpError> {
        let rendered = renderer
            .render_content(&item.body_markdown)
            .map_err(render_error)?;

        Ok(Self {
            id: item.id,
            title: item.title.clone(),
            slug: item.slug.clone(),
            status: item.status,
            content_type: item.content_type,
            scheduled_at: item.scheduled_at,
            modified_at: item.modified_at,
            author: AuthorView::from(&item.author),
            categories: item.categories.iter().map(CategoryView::from).collect(),
            html: rendered.html,
            summary_html: rendered.summary_html,
            is_truncated: rendered.is_truncated,
        })
    }

    pub fn render_all(
        items: &[ContentRecord],
        renderer: &MarkdownRenderer,
    ) -> Result<Vec<Self>, HttpError> {
        items
            .iter()
            .map(|item| Self::render(item, renderer))
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ListView<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ListView<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

pub fn render_error(err: RenderError) -> HttpError {
    HttpError::from_error(
        "infra::http::views::render",
        StatusCode::INTERNAL_SERVER_ERROR,
        "Content could not be rendered",
        &err,
    )
}
