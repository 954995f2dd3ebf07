use axum::Router;

use crate::config::AppState;

pub mod clustering;
pub mod health;
pub mod quiz;
pub mod sessions;
pub mod zoom;

/// Every endpoint, without the transport layers added in `build_router`
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .nest("/api/quiz", quiz::routes())
        .nest("/api/clustering", clustering::routes())
        .nest("/api/sessions", sessions::routes())
        .nest("/api/zoom", zoom::routes())
        .fallback(health::not_found)
}
