use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use serde::Deserialize;

use crate::{
    application::{
        error::{AppError, HttpError},
        feed::{self, FeedService},
        repos::ContentRepo,
    },
    cache::PageStore,
    infra::content,
    presentation::views::{LayoutChrome, render_not_found_response},
};

use super::{
    content_health_response,
    middleware::{log_responses, set_request_context},
};

/// Store key for the single listing page.
pub const FEED_PAGE_KEY: &str = "feed";

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub content: Arc<dyn ContentRepo>,
    pub chrome: LayoutChrome,
    pub post_pages: Arc<PageStore>,
    pub feed_page: Arc<PageStore>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/posts/{slug}", get(post_detail))
        .route("/feed/page", get(feed_page))
        .route("/_health/content", get(content_health))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CursorQuery {
    cursor: Option<String>,
}

async fn index(State(state): State<HttpState>) -> Response {
    let feed = state.feed.clone();
    let chrome = state.chrome.clone();
    let result = state
        .feed_page
        .get_or_generate(FEED_PAGE_KEY, move || {
            let feed = feed.clone();
            let chrome = chrome.clone();
            async move { feed::render_feed_bytes(&feed, &chrome).await }
        })
        .await;

    page_response(result, &state.chrome)
}

async fn post_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let feed = state.feed.clone();
    let chrome = state.chrome.clone();
    let key = slug.clone();
    let result = state
        .post_pages
        .get_or_generate(&key, move || {
            let feed = feed.clone();
            let chrome = chrome.clone();
            let slug = slug.clone();
            async move { feed::render_post_bytes(&feed, &chrome, &slug).await }
        })
        .await;

    page_response(result, &state.chrome)
}

async fn feed_page(
    State(state): State<HttpState>,
    Query(query): Query<CursorQuery>,
) -> Result<Response, HttpError> {
    let Some(cursor) = query.cursor else {
        return Err(HttpError::new(
            "infra::http::feed_page",
            StatusCode::BAD_REQUEST,
            "Missing cursor",
            "load-more requests must carry a cursor",
        ));
    };

    let page = state.feed.append_page(&cursor).await?;
    Ok(Json(content::listing_to_doc(&page)).into_response())
}

async fn content_health(State(state): State<HttpState>) -> Response {
    content_health_response(state.content.ping().await)
}

async fn fallback(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.chrome.clone())
}

fn page_response(result: Result<Bytes, AppError>, chrome: &LayoutChrome) -> Response {
    match result {
        Ok(html) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response(),
        Err(AppError::NotFound) => render_not_found_response(chrome.clone()),
        Err(err) => err.into_response(),
    }
}
