//! JSON route layer over the aggregation engine.
//!
//! Deliberately thin: two GET routes that delegate to the cache and shape
//! its snapshot into JSON. Responses are always 200 — per-feed failures
//! are absorbed by the aggregator and never surface here.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::cache::{ArticleCache, Snapshot};
use crate::model::Article;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ArticleCache>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/articles", get(get_articles))
        .route("/api/refresh", get(refresh_feeds))
        .with_state(state)
}

#[derive(Serialize)]
struct ArticlesResponse {
    articles: Vec<Article>,
    count: usize,
    last_updated: Option<i64>,
}

/// Cached article list, refreshed only when the freshness window elapsed.
async fn get_articles(State(state): State<AppState>) -> Json<ArticlesResponse> {
    let snapshot = state.cache.read_or_refresh().await;
    Json(ArticlesResponse {
        count: snapshot.articles.len(),
        last_updated: snapshot.last_updated,
        articles: articles_of(&snapshot),
    })
}

#[derive(Serialize)]
struct RefreshResponse {
    articles: Vec<Article>,
    count: usize,
    refreshed: bool,
}

/// Unconditional refetch of every feed, bypassing the freshness window.
async fn refresh_feeds(State(state): State<AppState>) -> Json<RefreshResponse> {
    let snapshot = state.cache.force_refresh().await;
    Json(RefreshResponse {
        count: snapshot.articles.len(),
        articles: articles_of(&snapshot),
        refreshed: true,
    })
}

fn articles_of(snapshot: &Snapshot) -> Vec<Article> {
    snapshot.articles.as_ref().clone()
}
