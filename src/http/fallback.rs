//! Local serving of paths no route claims.

use axum::http::StatusCode;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::FallbackConfig;

/// Router that serves unmatched paths according to `config`.
pub fn fallback_router(config: &FallbackConfig) -> Router {
    let Some(dir) = &config.static_dir else {
        return not_found_router();
    };

    tracing::info!(dir = %dir.display(), index = ?config.index_file, "Serving client assets");
    let serve_dir = ServeDir::new(dir);
    match &config.index_file {
        Some(index) => Router::new().fallback_service(serve_dir.fallback(ServeFile::new(dir.join(index)))),
        None => Router::new().fallback_service(serve_dir),
    }
}

/// Answers every request with 404.
pub fn not_found_router() -> Router {
    Router::new().fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
}
