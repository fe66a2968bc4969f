pub mod analysis;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

use axum::{routing::get, Router};
use ohlc_feed::TimeSeriesStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub store: TimeSeriesStore,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let store = TimeSeriesStore::new(config.feed.data_dir.clone());
        Arc::new(Self { config, store })
    }
}

/// API routes, with the dashboard served from `static_dir` for everything else.
pub fn router(state: Arc<AppState>) -> Router {
    let dashboard =
        ServeDir::new(&state.config.static_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/symbols", get(handlers::get_symbols))
        .route("/api/intervals", get(handlers::get_intervals))
        .route("/api/data/:symbol/:interval", get(handlers::get_series))
        .route("/api/overview/:mode/:interval", get(handlers::get_overview))
        .fallback_service(dashboard)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
