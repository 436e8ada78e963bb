use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{
        categories::CategoryService,
        error::HttpError,
        published::PublishedContentService,
        render::MarkdownRenderer,
        repos::HealthRepo,
        syndication::{SyndicationError, SyndicationService},
    },
    domain::archive::ArchivePeriod,
};

use super::{
    health_response,
    middleware::{log_responses, set_request_context},
    views::{CategoryView, ContentView, ListView, render_error},
};

const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";
const CSS_CONTENT_TYPE: &str = "text/css; charset=utf-8";

#[derive(Clone)]
pub struct HttpState {
    pub published: PublishedContentService,
    pub categories: CategoryService,
    pub syndication: SyndicationService,
    pub renderer: Arc<MarkdownRenderer>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/posts/{slug}", get(post_detail))
        .route("/pages/{slug}", get(page_detail))
        .route("/category/{slug}", get(category_index))
        .route("/author/{username}", get(author_index))
        .route("/archives/{year}", get(year_archive))
        .route("/archives/{year}/{month}", get(month_archive))
        .route("/archives/{year}/{month}/{day}", get(day_archive))
        .route("/categories", get(category_list))
        .route("/rss", get(rss_feed))
        .route("/static/syntax.css", get(syntax_css))
        .route("/_health", get(public_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IndexQuery {
    limit: Option<u32>,
}

async fn index(
    State(state): State<HttpState>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<ListView<ContentView>>, HttpError> {
    let limit = query
        .limit
        .unwrap_or_else(|| state.published.settings().recent_count);
    let items = state.published.get_recent_published(limit).await?;
    Ok(Json(ContentView::render_all(&items, &state.renderer)?.into()))
}

async fn post_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Json<ContentView>, HttpError> {
    let item = state.published.get_by_slug(&slug).await?;
    Ok(Json(ContentView::render(&item, &state.renderer)?))
}

async fn page_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Json<ContentView>, HttpError> {
    let item = state.published.get_page(&slug).await?;
    Ok(Json(ContentView::render(&item, &state.renderer)?))
}

async fn category_index(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Json<ListView<ContentView>>, HttpError> {
    let category = state.categories.find_by_slug(&slug).await?;
    let items = state.published.get_by_category(&category).await?;
    Ok(Json(ContentView::render_all(&items, &state.renderer)?.into()))
}

async fn author_index(
    State(state): State<HttpState>,
    Path(username): Path<String>,
) -> Result<Json<ListView<ContentView>>, HttpError> {
    let items = state.published.get_by_author(&username).await?;
    Ok(Json(ContentView::render_all(&items, &state.renderer)?.into()))
}

async fn year_archive(
    State(state): State<HttpState>,
    Path(year): Path<i32>,
) -> Result<Json<ListView<ContentView>>, HttpError> {
    archive(&state, ArchivePeriod::year(year)).await
}

async fn month_archive(
    State(state): State<HttpState>,
    Path((year, month)): Path<(i32, u8)>,
) -> Result<Json<ListView<ContentView>>, HttpError> {
    archive(&state, ArchivePeriod::month(year, month)).await
}

async fn day_archive(
    State(state): State<HttpState>,
    Path((year, month, day)): Path<(i32, u8, u8)>,
) -> Result<Json<ListView<ContentView>>, HttpError> {
    archive(&state, ArchivePeriod::day(year, month, day)).await
}

async fn archive(
    state: &HttpState,
    period: ArchivePeriod,
) -> Result<Json<ListView<ContentView>>, HttpError> {
    let items = state.published.get_archive(period).await?;
    Ok(Json(ContentView::render_all(&items, &state.renderer)?.into()))
}

async fn category_list(
    State(state): State<HttpState>,
) -> Result<Json<ListView<CategoryView>>, HttpError> {
    let categories = state.categories.list().await?;
    Ok(Json(
        categories
            .iter()
            .map(CategoryView::from)
            .collect::<Vec<_>>()
            .into(),
    ))
}

async fn rss_feed(State(state): State<HttpState>) -> Result<Response, HttpError> {
    let xml = state.syndication.rss_feed().await.map_err(|err| match err {
        SyndicationError::Content(err) => HttpError::from(err),
        SyndicationError::Render(err) => render_error(err),
    })?;

    let mut response = (StatusCode::OK, xml).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(RSS_CONTENT_TYPE));
    Ok(response)
}

async fn syntax_css() -> Response {
    let mut response = (StatusCode::OK, MarkdownRenderer::theme_css()).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(CSS_CONTENT_TYPE));
    response
}

async fn public_health(State(state): State<HttpState>) -> Response {
    health_response(state.health.ping().await)
}
