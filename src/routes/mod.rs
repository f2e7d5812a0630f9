use axum::{Extension, Router};
use std::path::Path;
use tower_http::services::ServeDir;

use crate::state::AppState;

pub mod history;
pub mod update;

pub fn router() -> Router {
    Router::new()
        .merge(update::router())
        .merge(history::router())
}

/// API routes plus the viewer page and assets from `static_dir`.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    router()
        .fallback_service(ServeDir::new(static_dir))
        .layer(Extension(state))
}
