use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use learning_utils::clustering::{ClusterUpdate, PerformanceSignal, SessionClusters};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::{auth::CurrentUser, config::AppState, error::Error, extract::JsonBody};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/session/{session_id}", get(get_clusters))
        .route("/update", post(post_update))
        .route("/student/{student_id}", get(get_student_cluster))
        .route("/assign", post(post_assign))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    session_id: Option<String>,
    quiz_performance: Option<PerformanceSignal>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    session_id: Option<String>,
    cluster_id: Option<String>,
    student_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    session_id: Option<String>,
}

pub async fn get_clusters(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<SessionClusters> {
    info!("Getting clusters for session: {session_id}");
    let clusters = state.clusters.get_clusters(&session_id);
    Json(clusters)
}

pub async fn post_update(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UpdateRequest>,
) -> Result<Json<SessionClusters>, Error> {
    let Some(session_id) = request.session_id.clone().filter(|s| !s.is_empty()) else {
        return Err(Error::bad_request("Missing sessionId", &request));
    };

    info!(session = %session_id, performance = ?request.quiz_performance, "Updating clusters");
    let clusters = state.clusters.update_clusters(ClusterUpdate {
        session_id,
        quiz_performance: request.quiz_performance,
    });
    Ok(Json(clusters))
}

pub async fn get_student_cluster(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Value>, Error> {
    let Some(session_id) = query.session_id.clone().filter(|s| !s.is_empty()) else {
        return Err(Error::bad_request(
            "Missing required parameters",
            json!({ "studentId": student_id, "sessionId": query.session_id }),
        ));
    };

    let cluster_id = state.clusters.get_student_cluster(&student_id, &session_id);
    Ok(Json(json!({ "clusterId": cluster_id })))
}

pub async fn post_assign(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(request): JsonBody<AssignRequest>,
) -> Result<Json<Value>, Error> {
    let (Some(session_id), Some(cluster_id), Some(student_id)) = (
        request.session_id.as_deref().filter(|s| !s.is_empty()),
        request.cluster_id.as_deref().filter(|s| !s.is_empty()),
        request.student_id.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return Err(Error::bad_request("Missing required fields", &request));
    };

    user.require_instructor("Forbidden: Instructor access required")?;

    if !state
        .clusters
        .assign_student(session_id, cluster_id, student_id)
    {
        return Err(Error::not_found());
    }
    Ok(Json(json!({ "success": true })))
}
