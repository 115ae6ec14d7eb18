use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use utoipa::OpenApi;

use crate::{responses, AppState};

/// Health probe.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Meta",
    operation_id = "healthz_doc",
    description = "Service readiness probe.",
    responses(
        (status = 200, description = "Service healthy", body = serde_json::Value)
    )
)]
pub async fn healthz() -> impl IntoResponse {
    responses::json_ok(json!({"ok": true}))
}

/// Service metadata and endpoints index.
#[utoipa::path(
    get,
    path = "/about",
    tag = "Meta",
    operation_id = "about_doc",
    description = "Service metadata and endpoints index.",
    responses(
        (status = 200, description = "Service metadata", body = serde_json::Value)
    )
)]
pub async fn about(State(state): State<AppState>) -> impl IntoResponse {
    let endpoints = state.endpoints();
    responses::json_ok(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "subscription_configured": state.config().subscription_id.is_some(),
        "sources": state
            .sources()
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>(),
        "endpoints": endpoints.as_ref(),
    }))
}

/// Generated OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    Json(crate::openapi::ApiDoc::openapi())
}
