//! Drives `ZoomClient` against a local axum server impersonating the Zoom API

use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use zoom::{Error, MeetingRequest, MeetingScheduler, ZoomClient, ZoomConfig};

/// `client-id:client-secret`
const EXPECTED_BASIC: &str = "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=";

async fn token(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != EXPECTED_BASIC {
        return (StatusCode::UNAUTHORIZED, Json(json!({"reason": "bad creds"})));
    }
    (StatusCode::OK, Json(json!({"access_token": "tok-1"})))
}

async fn create_meeting(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != "Bearer tok-1" {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    if body["topic"] == "reject me" {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "Invalid topic"})));
    }
    let expected_booking = body["type"] == 2
        && body["start_time"] == "2030-05-01T09:30:00.000Z"
        && body["duration"] == 45
        && body["timezone"] == "UTC"
        && body["settings"]
            == json!({"join_before_host": true, "approval_type": 0, "waiting_room": false});
    if !expected_booking {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body));
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 8123456789u64,
            "join_url": "https://zoom.test/j/8123456789",
            "start_url": "https://zoom.test/s/8123456789",
        })),
    )
}

async fn spawn_vendor() -> String {
    let app = Router::new()
        .route("/oauth/token", post(token))
        .route("/v2/users/me/meetings", post(create_meeting));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(base: &str) -> ZoomConfig {
    ZoomConfig {
        account_id: Some("acct".into()),
        client_id: Some("client-id".into()),
        client_secret: Some("client-secret".into()),
        api_base: format!("{base}/v2"),
        oauth_url: format!("{base}/oauth/token"),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn request(topic: &str) -> MeetingRequest {
    MeetingRequest {
        topic: topic.to_string(),
        start_time: Utc.with_ymd_and_hms(2030, 5, 1, 9, 30, 0).unwrap(),
        duration: 45,
        timezone: None,
    }
}

#[tokio::test]
async fn access_token_uses_basic_credentials() {
    let base = spawn_vendor().await;
    let client = ZoomClient::new(config(&base)).unwrap();

    assert_eq!(client.get_access_token().await.unwrap(), "tok-1");
}

#[tokio::test]
async fn rejected_credentials_surface_status_and_body() {
    let base = spawn_vendor().await;
    let client = ZoomClient::new(ZoomConfig {
        client_secret: Some("wrong".into()),
        ..config(&base)
    })
    .unwrap();

    let err = client.get_access_token().await.unwrap_err();
    match &err {
        Error::Vendor { status, body, .. } => {
            assert_eq!(*status, 401);
            assert!(body.contains("bad creds"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().starts_with("Zoom token error 401"));
}

#[tokio::test]
async fn missing_credentials_fail_before_any_request() {
    let client = ZoomClient::new(ZoomConfig {
        account_id: None,
        ..config("http://127.0.0.1:9")
    })
    .unwrap();

    let err = client.get_access_token().await.unwrap_err();
    assert!(matches!(err, Error::NotConfigured(_)));
}

#[tokio::test]
async fn create_meeting_returns_links_and_stringified_id() {
    let base = spawn_vendor().await;
    let client = ZoomClient::new(config(&base)).unwrap();

    let meeting = client.create_meeting(&request("Neural Networks")).await.unwrap();

    assert_eq!(meeting.id, "8123456789");
    assert_eq!(meeting.join_url, "https://zoom.test/j/8123456789");
    assert_eq!(meeting.start_url, "https://zoom.test/s/8123456789");
}

#[tokio::test]
async fn vendor_rejection_embeds_status_and_body() {
    let base = spawn_vendor().await;
    let client = ZoomClient::new(config(&base)).unwrap();

    let err = client.create_meeting(&request("reject me")).await.unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("Zoom create meeting error 400"), "{message}");
    assert!(message.contains("Invalid topic"));
}
