use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use learning_utils::quiz::{AnswerSubmission, NewQuestion, Question, QuizPerformance, SubmitOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{auth::CurrentUser, config::AppState, error::Error, extract::JsonBody};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(post_submit))
        .route("/performance/{question_id}", get(get_performance))
        .route("/trigger", post(post_trigger))
        .route("/questions", get(get_questions).post(post_question))
        .route("/questions/{question_id}", get(get_question))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    question_id: Option<String>,
    answer_index: Option<i64>,
    time_taken: Option<f64>,
    student_id: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    question_id: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    session_id: Option<String>,
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

pub async fn post_submit(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SubmitRequest>,
) -> Result<Json<SubmitOutcome>, Error> {
    let submission = match (
        present(&request.question_id),
        request.answer_index,
        request.time_taken.filter(|t| *t != 0.0),
        present(&request.student_id),
        present(&request.session_id),
    ) {
        (
            Some(question_id),
            Some(answer_index),
            Some(time_taken),
            Some(student_id),
            Some(session_id),
        ) => AnswerSubmission {
            question_id,
            answer_index,
            time_taken,
            student_id,
            session_id,
        },
        _ => return Err(Error::bad_request("Missing required fields", &request)),
    };

    Ok(Json(state.quiz.submit_answer(submission)))
}

pub async fn get_performance(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(question_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<QuizPerformance>, Error> {
    let Some(session_id) = present(&query.session_id) else {
        return Err(Error::bad_request(
            "Missing required parameters",
            json!({ "questionId": question_id, "sessionId": query.session_id }),
        ));
    };

    if !user.is_instructor() {
        warn!(user = %user.id, role = ?user.role, "Non-instructor accessing performance data");
    }

    let performance = state.quiz.get_performance(&question_id, &session_id)?;
    Ok(Json(performance))
}

pub async fn post_trigger(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(request): JsonBody<TriggerRequest>,
) -> Result<Json<Value>, Error> {
    let (Some(question_id), Some(session_id)) =
        (present(&request.question_id), present(&request.session_id))
    else {
        return Err(Error::bad_request("Missing required fields", &request));
    };

    user.require_instructor("Forbidden: Instructor access required")?;

    let success = state.quiz.trigger_question(&question_id, &session_id);
    info!(question = %question_id, session = %session_id, "question triggered");
    Ok(Json(json!({ "success": success })))
}

pub async fn get_questions(State(state): State<AppState>) -> Json<Vec<Question>> {
    Json(state.quiz.questions().list())
}

pub async fn get_question(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> Result<Json<Question>, Error> {
    state
        .quiz
        .questions()
        .find(&question_id)
        .map(Json)
        .ok_or_else(Error::not_found)
}

pub async fn post_question(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(new): JsonBody<NewQuestion>,
) -> Result<(StatusCode, Json<Question>), Error> {
    user.require_instructor("Forbidden: Instructor access required")?;

    let question = state.quiz.questions().create(new.clone()).map_err(|e| match e {
        learning_utils::error::Error::Validation(message) => Error::bad_request(message, &new),
        other => other.into(),
    })?;
    Ok((StatusCode::CREATED, Json(question)))
}
