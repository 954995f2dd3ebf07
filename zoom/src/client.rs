use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::{config::ZoomConfig, error::Error};

/// Zoom meeting type for a meeting with a fixed start time
const SCHEDULED_MEETING: u8 = 2;

#[derive(Clone, Debug, PartialEq)]
pub struct MeetingRequest {
    pub topic: String,
    pub start_time: DateTime<Utc>,
    /// Minutes
    pub duration: u32,
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub join_url: String,
    pub start_url: String,
}

/// Anything able to book a meeting on the vendor side
#[async_trait]
pub trait MeetingScheduler: Send + Sync {
    async fn create_meeting(&self, request: &MeetingRequest) -> Result<Meeting, Error>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct MeetingResponse {
    id: Value,
    join_url: String,
    start_url: String,
}

#[derive(Clone, Debug)]
pub struct ZoomClient {
    http: reqwest::Client,
    config: ZoomConfig,
}

impl ZoomClient {
    pub fn new(config: ZoomConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ZoomConfig {
        &self.config
    }

    /// Exchanges the account credentials for a bearer token
    #[instrument(skip_all, err(Debug))]
    pub async fn get_access_token(&self) -> Result<String, Error> {
        let (Some(account_id), Some(client_id), Some(client_secret)) = (
            self.config.account_id.as_deref(),
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
        ) else {
            return Err(Error::NotConfigured("Zoom S2S OAuth credentials"));
        };

        let res = self
            .http
            .post(&self.config.oauth_url)
            .query(&[
                ("grant_type", "account_credentials"),
                ("account_id", account_id),
            ])
            .basic_auth(client_id, Some(client_secret))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Vendor {
                context: "token",
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = res.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl MeetingScheduler for ZoomClient {
    #[instrument(skip_all, fields(topic = %request.topic), err(Debug))]
    async fn create_meeting(&self, request: &MeetingRequest) -> Result<Meeting, Error> {
        let token = self.get_access_token().await?;

        let body = json!({
            "topic": request.topic,
            "type": SCHEDULED_MEETING,
            "start_time": request.start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            "duration": request.duration,
            "timezone": request.timezone.as_deref().unwrap_or("UTC"),
            "settings": {
                "join_before_host": true,
                "approval_type": 0,
                "waiting_room": false,
            },
        });

        let res = self
            .http
            .post(format!("{}/users/me/meetings", self.config.api_base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Vendor {
                context: "create meeting",
                status: status.as_u16(),
                body,
            });
        }

        let created: MeetingResponse = res.json().await?;
        let id = match created.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        debug!(meeting = %id, "meeting created");

        Ok(Meeting {
            id,
            join_url: created.join_url,
            start_url: created.start_url,
        })
    }
}
