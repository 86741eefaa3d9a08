pub mod error;
pub mod extract;
pub mod handlers;

use anyhow::Result;
use axum::{routing::{get, post}, Router};
use smartkeep_core::{DocumentStore, EngineConfig, SearchService};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::extract::PageFetcher;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
    pub store: Arc<dyn DocumentStore>,
    pub fetcher: Arc<PageFetcher>,
}

impl AppState {
    /// Build the search context from the store's current corpus.
    pub fn new(config: EngineConfig, store: Arc<dyn DocumentStore>, fetch_timeout: Duration) -> Result<Self> {
        let service = SearchService::from_store(config, store.as_ref())?;
        let fetcher = PageFetcher::new(fetch_timeout, concat!("smartkeep/", env!("CARGO_PKG_VERSION")))?;
        Ok(Self { service: Arc::new(service), store, fetcher: Arc::new(fetcher) })
    }
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/stats", get(handlers::stats))
        .route("/search", get(handlers::search))
        .route("/search/tfidf", get(handlers::search_tfidf))
        .route("/search/benchmark", get(handlers::benchmark))
        .route("/evaluate", post(handlers::evaluate))
        .route("/evaluate/precision", get(handlers::evaluate_precision))
        .route("/documents", get(handlers::list_documents).post(handlers::create_document))
        .route("/documents/", get(handlers::list_documents).post(handlers::create_document))
        .route("/documents/:id", get(handlers::get_document))
        .route("/content/manual", post(handlers::create_manual))
        .route("/content/url", post(handlers::create_from_url))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
