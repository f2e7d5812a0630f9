use axum::{extract::Extension, http::HeaderMap, routing::get, Json, Router};

use crate::{
    action::SanitizedAction,
    state::AppState,
    utils::auth::{self, Unauthorized},
};

pub fn router() -> Router {
    Router::new().route("/history.js", get(history))
}

async fn history(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SanitizedAction>>, Unauthorized> {
    auth::require(&headers, state.credentials())?;

    let snapshot = state.history.lock().await.snapshot();
    Ok(Json(snapshot.iter().map(|a| a.sanitize()).collect()))
}
