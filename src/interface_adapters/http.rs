// Plain HTTP routes and the shared JSON error payload.

use crate::interface_adapters::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn error_response(status: StatusCode, error: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.input_tx.is_closed() {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "simulation stopped");
    }
    "ok".into_response()
}
