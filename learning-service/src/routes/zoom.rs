use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use zoom::{
    signature::{SdkRole, generate_sdk_signature, sign_url_validation},
    webhook::{
        MEETING_ENDED_EVENT, MEETING_STARTED_EVENT, URL_VALIDATION_EVENT, WEBHOOK_TOKEN_HEADER,
        WebhookEvent, verify_webhook,
    },
};

use crate::{config::AppState, error::Error, extract::JsonBody};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(post_webhook))
        .route("/signature", post(post_signature))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    #[serde(default)]
    meeting_number: Value,
    #[serde(default)]
    role: Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureResponse {
    signature: String,
    sdk_key: Option<String>,
}

pub async fn post_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(event): JsonBody<WebhookEvent>,
) -> Result<Json<Value>, Error> {
    let secret = state.zoom.webhook_secret.as_deref();

    if event.name() == URL_VALIDATION_EVENT {
        let (Some(plain_token), Some(secret)) = (event.plain_token(), secret) else {
            return Err(Error::bad_request("Missing plainToken or secret", &event));
        };
        let encrypted_token = sign_url_validation(secret, plain_token)?;
        return Ok(Json(json!({
            "plainToken": plain_token,
            "encryptedToken": encrypted_token,
        })));
    }

    let header_token = headers
        .get(WEBHOOK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if !verify_webhook(secret, header_token) {
        warn!(event = %event.name(), "rejected webhook delivery");
        return Err(Error::Unauthorized("Invalid webhook signature".to_string()));
    }

    match event.name() {
        name @ (MEETING_STARTED_EVENT | MEETING_ENDED_EVENT) => {
            let meeting_id = event.meeting_id();
            let session = meeting_id
                .as_deref()
                .and_then(|id| state.sessions.find_by_meeting_id(id));
            // Session status stays derived from the schedule
            info!(
                event = %name,
                meeting = ?meeting_id,
                session = ?session.map(|s| s.id),
                "meeting lifecycle event"
            );
        }
        other => debug!(event = %other, "ignoring webhook event"),
    }

    Ok(Json(json!({ "received": true })))
}

pub async fn post_signature(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SignatureRequest>,
) -> Result<Json<SignatureResponse>, Error> {
    let meeting_number = match &request.meeting_number {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) if n.as_f64() != Some(0.0) => n.to_string(),
        _ => {
            return Err(Error::bad_request("meetingNumber required", &request));
        }
    };
    let role = SdkRole::from(request.role.as_i64().unwrap_or(0));

    let signature = generate_sdk_signature(&state.zoom, &meeting_number, role, state.clock.now())
        .map_err(|e| Error::Server(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(SignatureResponse {
        signature,
        sdk_key: state.zoom.sdk_key.clone(),
    }))
}
