//! Learning platform HTTP API
//!
//! Sessions, quiz answers, engagement clusters and Zoom integration over JSON.

use std::time::Duration;

use axum::{
    Router,
    http::{
        HeaderName, HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use tower_http::{
    LatencyUnit,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, warn};

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod meeting;
pub mod routes;

pub use config::{AppState, EnvVars};

/// Full application: routes plus timeout, body limit, CORS and tracing layers
pub fn build_router(state: AppState) -> Router {
    let env_vars = &state.env_vars;

    let origins: Vec<HeaderValue> = env_vars
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("ignoring invalid CORS origin '{origin}': {e}");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(auth::ROLE_HEADER),
        ]);

    routes::routes()
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_millis(env_vars.request_timeout_in_ms),
        ))
        .layer(RequestBodyLimitLayer::new(env_vars.request_body_size_limit))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
        .with_state(state)
}
