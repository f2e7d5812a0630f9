use axum::{
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::{
    state::AppState,
    utils::auth::{self, Unauthorized},
};

pub fn router() -> Router {
    Router::new().route("/update.js", get(update))
}

/* ---------------- long-poll: one action, then close ---------------- */
async fn update(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Response, Unauthorized> {
    auth::require(&headers, state.credentials())?;

    // dropped together with this future if the client goes away
    let pending = state.hub.register();
    let resp = match pending.recv().await {
        Some(body) => ([(header::CONTENT_TYPE, "application/json")], body.to_string()).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    };
    Ok(resp)
}
