use std::{env::var, time::Duration};

use tracing::warn;

pub const DEFAULT_API_BASE: &str = "https://api.zoom.us/v2";
pub const DEFAULT_OAUTH_URL: &str = "https://zoom.us/oauth/token";

#[derive(Clone, Debug)]
pub struct ZoomConfig {
    pub account_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub sdk_key: Option<String>,
    pub sdk_secret: Option<String>,
    /// Shared webhook secret. When unset every delivery is accepted.
    pub webhook_secret: Option<String>,
    pub api_base: String,
    pub oauth_url: String,
    pub request_timeout: Duration,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            account_id: None,
            client_id: None,
            client_secret: None,
            sdk_key: None,
            sdk_secret: None,
            webhook_secret: None,
            api_base: DEFAULT_API_BASE.to_string(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            request_timeout: Duration::from_millis(10_000),
        }
    }
}

impl ZoomConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let account_id = optional("ZOOM_ACCOUNT_ID");
        let client_id = optional("ZOOM_CLIENT_ID");
        let client_secret = optional("ZOOM_CLIENT_SECRET");
        if account_id.is_none() || client_id.is_none() || client_secret.is_none() {
            warn!("Zoom S2S OAuth credentials incomplete. Meeting creation will fail.");
        }

        let sdk_key = optional("ZOOM_SDK_KEY");
        let sdk_secret = optional("ZOOM_SDK_SECRET");
        if sdk_key.is_none() || sdk_secret.is_none() {
            warn!("ZOOM_SDK_KEY/ZOOM_SDK_SECRET not set. SDK signatures unavailable.");
        }

        let webhook_secret = optional("ZOOM_WEBHOOK_SECRET");
        if webhook_secret.is_none() {
            warn!("ZOOM_WEBHOOK_SECRET not set. Accepting all webhook deliveries; do not run like this in production.");
        }

        let api_base = optional("ZOOM_API_BASE").unwrap_or_else(|| {
            warn!("ZOOM_API_BASE not set. Defaulting to {DEFAULT_API_BASE}");
            defaults.api_base.clone()
        });
        let oauth_url = optional("ZOOM_OAUTH_URL").unwrap_or_else(|| {
            warn!("ZOOM_OAUTH_URL not set. Defaulting to {DEFAULT_OAUTH_URL}");
            defaults.oauth_url.clone()
        });

        let request_timeout = match var("ZOOM_REQUEST_TIMEOUT_IN_MS") {
            Ok(s) => Duration::from_millis(
                s.parse()
                    .expect("ZOOM_REQUEST_TIMEOUT_IN_MS to be valid unsigned integer"),
            ),
            Err(_e) => {
                warn!(
                    "ZOOM_REQUEST_TIMEOUT_IN_MS not set. Defaulting to {}",
                    defaults.request_timeout.as_millis()
                );
                defaults.request_timeout
            }
        };

        Self {
            account_id,
            client_id,
            client_secret,
            sdk_key,
            sdk_secret,
            webhook_secret,
            api_base,
            oauth_url,
            request_timeout,
        }
    }
}

fn optional(name: &str) -> Option<String> {
    var(name).ok().filter(|v| !v.is_empty())
}
