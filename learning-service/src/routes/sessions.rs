use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use learning_utils::session::{NewSession, Session, SessionPatch};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::{auth::CurrentUser, config::AppState, error::Error, extract::JsonBody, meeting};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_sessions).post(post_session))
        .route(
            "/{id}",
            get(get_session).put(put_session).delete(delete_session),
        )
        .route("/{id}/join", post(post_join))
        .route("/{id}/zoom", post(post_zoom))
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(flatten)]
    session: NewSession,
    /// Book a meeting alongside the session. Defaults to true.
    create_zoom: Option<bool>,
}

pub async fn get_sessions(State(state): State<AppState>) -> Json<Vec<Session>> {
    Json(state.sessions.list())
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, Error> {
    state
        .sessions
        .get_by_id(&id)
        .map(Json)
        .ok_or_else(Error::not_found)
}

pub async fn post_session(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(request): JsonBody<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), Error> {
    user.require_instructor("Forbidden")?;

    let CreateSessionRequest {
        mut session,
        create_zoom,
    } = request;
    // The instructor is always the caller
    session.instructor = None;
    session.instructor_id = Some(user.id.clone());

    let created = state
        .sessions
        .create(session.clone())
        .map_err(|e| match e {
            learning_utils::error::Error::InvalidSchedule(message) => {
                Error::bad_request(message, &session)
            }
            other => other.into(),
        })?;
    info!(session = %created.id, status = ?created.status, "session created");

    let created = if create_zoom.unwrap_or(true) {
        meeting::attach_meeting_best_effort(&state, created).await
    } else {
        created
    };

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn put_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<SessionPatch>,
) -> Result<Json<Session>, Error> {
    user.require_instructor("Forbidden")?;

    let updated = state.sessions.update(&id, patch.clone()).map_err(|e| match e {
        learning_utils::error::Error::NotFound(_) => Error::not_found(),
        learning_utils::error::Error::InvalidSchedule(message)
        | learning_utils::error::Error::Validation(message) => Error::bad_request(message, &patch),
    })?;
    Ok(Json(updated))
}

pub async fn delete_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, Error> {
    user.require_instructor("Forbidden")?;

    if !state.sessions.remove(&id) {
        return Err(Error::not_found());
    }
    info!(session = %id, "session removed");
    Ok(Json(json!({ "success": true })))
}

pub async fn post_join(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, Error> {
    if !state.sessions.join(&id, &user.id) {
        return Err(Error::not_found());
    }
    Ok(Json(json!({ "success": true })))
}

/// Books a new meeting for an existing session, replacing any previous one
pub async fn post_zoom(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Session>, Error> {
    user.require_instructor("Forbidden")?;

    let updated = meeting::refresh_meeting(&state, &id).await?;
    Ok(Json(updated))
}
