use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header Zoom deliveries carry the shared token in
pub const WEBHOOK_TOKEN_HEADER: &str = "x-zoom-webhook-token";

pub const URL_VALIDATION_EVENT: &str = "endpoint.url_validation";
pub const MEETING_STARTED_EVENT: &str = "meeting.started";
pub const MEETING_ENDED_EVENT: &str = "meeting.ended";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl WebhookEvent {
    pub fn name(&self) -> &str {
        self.event.as_deref().unwrap_or("unknown")
    }

    pub fn plain_token(&self) -> Option<&str> {
        self.payload.get("plainToken").and_then(Value::as_str)
    }

    /// Meeting id of `meeting.*` events, numeric or string
    pub fn meeting_id(&self) -> Option<String> {
        match self.payload.get("object")?.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Development-grade delivery check.
///
/// Without a configured secret every delivery is accepted. With one, the header token
/// must equal it exactly; the comparison is not constant-time.
pub fn verify_webhook(secret: Option<&str>, header_token: Option<&str>) -> bool {
    match secret {
        None => true,
        Some(secret) => header_token.is_some_and(|token| token == secret),
    }
}
