use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

pub fn json_ok(payload: Value) -> axum::response::Response {
    (StatusCode::OK, Json(payload)).into_response()
}

/// RequestMalformed surface: the request never reaches the pipeline.
pub fn bad_request(detail: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": detail,
            "status": 400,
        })),
    )
        .into_response()
}
