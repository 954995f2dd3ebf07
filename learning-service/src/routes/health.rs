use axum::{
    Json, Router,
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::info;

use crate::config::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
}

fn endpoints() -> Value {
    json!({
        "health": "/health",
        "quiz": "/api/quiz",
        "clustering": "/api/clustering",
        "sessions": "/api/sessions",
        "zoom": "/api/zoom",
    })
}

pub async fn get_health() -> impl IntoResponse {
    info!("Status");
    Json(json!({
        "status": "ok",
        "message": "Server is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn get_root() -> impl IntoResponse {
    Json(json!({
        "message": "Learning Platform API",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "endpoints": endpoints(),
    }))
}

pub async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "path": uri.path(),
            "method": method.as_str(),
            "availableEndpoints": endpoints(),
        })),
    )
}
