pub mod routes;

pub use routes::*;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::middleware::request_logging;

/// Create the API router.
///
/// The `/api/...` paths are the ones the bundled web UI calls; the short paths are
/// the canonical ones.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/probe-sweep", post(probe_sweep))
        .route("/api/speed-test", post(probe_sweep))
        .route("/probe-sweep/cached", get(cached_report))
        .route("/api/speed-test/cached", get(cached_report))
        .route("/resolve-source", post(resolve_source))
        .route("/api/set-source", post(resolve_source))
        .route("/api/sources", get(list_sources))
        .route("/health", get(health_check))
        .route("/api/health", get(health_check))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

/// Serve the web UI for every path the API does not claim, falling back to
/// `index.html` so client-side routes resolve.
pub fn with_static_assets(router: Router, root: &Path) -> Router {
    let index = ServeFile::new(root.join("index.html"));
    router.fallback_service(ServeDir::new(root).fallback(index))
}
