//! Administrative JSON API, bound to its own listener.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::{
        admin::{
            AdminAuthorService, AdminCategoryService, AdminContentService, CreateAuthorCommand,
            CreateCategoryCommand, CreateContentCommand, UpdateCategoryCommand,
            UpdateContentCommand,
        },
        error::HttpError,
        render::MarkdownRenderer,
        repos::HealthRepo,
    },
    cache::CacheTrigger,
    domain::types::{ContentStatus, ContentType},
};

use super::{
    health_response,
    middleware::{log_responses, set_request_context},
    views::{AuthorView, CategoryView, ContentView},
};

#[derive(Clone)]
pub struct AdminState {
    pub content: AdminContentService,
    pub categories: AdminCategoryService,
    pub authors: AdminAuthorService,
    pub trigger: CacheTrigger,
    pub renderer: Arc<MarkdownRenderer>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/api/authors", post(create_author))
        .route("/api/content", post(create_content))
        .route(
            "/api/content/{id}",
            patch(update_content).delete(delete_content),
        )
        .route("/api/categories", post(create_category))
        .route(
            "/api/categories/{id}",
            patch(update_category).delete(delete_category),
        )
        .route("/api/cache/clear", post(clear_cache))
        .route("/_health", get(admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

fn default_status() -> ContentStatus {
    ContentStatus::Draft
}

fn default_content_type() -> ContentType {
    ContentType::Post
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AuthorCreateRequest {
    pub username: String,
    pub first_name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ContentCreateRequest {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub body_markdown: String,
    #[serde(default = "default_status")]
    pub status: ContentStatus,
    #[serde(default = "default_content_type")]
    pub content_type: ContentType,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    pub author_id: Uuid,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ContentUpdateRequest {
    pub title: Option<String>,
    pub body_markdown: Option<String>,
    pub status: Option<ContentStatus>,
    pub content_type: Option<ContentType>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    pub category_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CategoryCreateRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CategoryUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

async fn create_author(
    State(state): State<AdminState>,
    Json(payload): Json<AuthorCreateRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let author = state
        .authors
        .create(CreateAuthorCommand {
            username: payload.username,
            first_name: payload.first_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AuthorView::from(&author))))
}

async fn create_content(
    State(state): State<AdminState>,
    Json(payload): Json<ContentCreateRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let command = CreateContentCommand {
        title: payload.title,
        slug: payload.slug,
        body_markdown: payload.body_markdown,
        status: payload.status,
        content_type: payload.content_type,
        scheduled_at: payload.scheduled_at,
        author_id: payload.author_id,
        category_ids: payload.category_ids,
    };

    let record = state.content.create(command).await?;
    let view = ContentView::render(&record, &state.renderer)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update_content(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContentUpdateRequest>,
) -> Result<Json<ContentView>, HttpError> {
    let command = UpdateContentCommand {
        id,
        title: payload.title,
        body_markdown: payload.body_markdown,
        status: payload.status,
        content_type: payload.content_type,
        scheduled_at: payload.scheduled_at,
        category_ids: payload.category_ids,
    };

    let record = state.content.update(command).await?;
    Ok(Json(ContentView::render(&record, &state.renderer)?))
}

async fn delete_content(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    state.content.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_category(
    State(state): State<AdminState>,
    Json(payload): Json<CategoryCreateRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let record = state
        .categories
        .create(CreateCategoryCommand {
            name: payload.name,
            slug: payload.slug,
            description: payload.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CategoryView::from(&record))))
}

async fn update_category(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryUpdateRequest>,
) -> Result<Json<CategoryView>, HttpError> {
    let record = state
        .categories
        .update(UpdateCategoryCommand {
            id,
            name: payload.name,
            description: payload.description,
        })
        .await?;

    Ok(Json(CategoryView::from(&record)))
}

async fn delete_category(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    state.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_cache(State(state): State<AdminState>) -> StatusCode {
    state.trigger.clear_all();
    StatusCode::NO_CONTENT
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    health_response(state.health.ping().await)
}
