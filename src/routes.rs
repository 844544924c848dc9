use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::article::Article;
use crate::service::NewsService;
use crate::sources::{Category, FeedSource, Locale, SourceRegistry};

pub const NEWS_STATUS_HEADER: &str = "x-news-status";

pub struct AppState {
    pub news: NewsService,
    pub registry: Arc<SourceRegistry>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/news", get(news))
        .route("/sources", get(sources))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    pub locale: Option<String>,
    pub category: Option<String>,
    /// Comma-separated source labels
    pub sources: Option<String>,
}

impl NewsQuery {
    pub fn locale(&self) -> Locale {
        Locale::from_query(self.locale.as_deref())
    }

    /// Unknown categories are ignored rather than rejected.
    pub fn category(&self) -> Option<Category> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }

    pub fn source_labels(&self) -> Vec<&str> {
        self.sources
            .as_deref()
            .map(|s| s.split(',').map(str::trim).filter(|l| !l.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn apply(&self, articles: Vec<Article>) -> Vec<Article> {
        let category = self.category();
        let labels = self.source_labels();

        articles
            .into_iter()
            .filter(|a| category.map_or(true, |c| a.category == c))
            .filter(|a| labels.is_empty() || labels.contains(&a.source.as_str()))
            .collect()
    }
}

// A malformed query string still gets a response
fn query_or_default(query: Option<Query<NewsQuery>>) -> NewsQuery {
    query.map(|Query(q)| q).unwrap_or_default()
}

pub async fn news(
    State(state): State<Arc<AppState>>,
    query: Option<Query<NewsQuery>>,
) -> impl IntoResponse {
    let query = query_or_default(query);
    let outcome = state.news.news(query.locale()).await;
    let status = outcome.status();
    let articles = query.apply(outcome.into_articles());

    ([(NEWS_STATUS_HEADER, status)], Json(articles))
}

pub async fn sources(
    State(state): State<Arc<AppState>>,
    query: Option<Query<NewsQuery>>,
) -> Json<Vec<FeedSource>> {
    let locale = query_or_default(query).locale();
    let sources = state
        .registry
        .sources_for(locale)
        .map(|s| s.to_vec())
        .unwrap_or_default();
    Json(sources)
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
