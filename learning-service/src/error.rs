use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::error;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Missing or malformed input. `received` echoes what the caller sent.
    #[error("{message}")]
    BadRequest { message: String, received: Value },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{1}")]
    Server(StatusCode, String),
    // Froms
    #[error("{0}")]
    Domain(#[from] learning_utils::error::Error),
    #[error("{0}")]
    Zoom(#[from] zoom::Error),
}

impl Error {
    pub fn bad_request(message: impl Into<String>, received: impl serde::Serialize) -> Self {
        Error::BadRequest {
            message: message.into(),
            received: serde_json::to_value(received).unwrap_or(Value::Null),
        }
    }

    pub fn not_found() -> Self {
        Error::NotFound("Not found".to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);

        let body = match self {
            Error::BadRequest { message, received } => json!({
                "error": message,
                "received": received,
            }),
            Error::Domain(learning_utils::error::Error::NotFound(message)) => json!({
                "error": "Not found",
                "message": message,
            }),
            Error::Unauthorized(message)
            | Error::Forbidden(message)
            | Error::NotFound(message)
            | Error::Server(_, message) => json!({ "error": message }),
            Error::Domain(e) => json!({ "error": e.to_string() }),
            Error::Zoom(e) => {
                error!(error = ?e, "unhandled gateway error");
                let mut body = json!({
                    "error": "Internal server error",
                    "message": e.to_string(),
                });
                if cfg!(debug_assertions) {
                    body["stack"] = Value::String(format!("{e:?}"));
                }
                body
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<&Error> for StatusCode {
    fn from(error: &Error) -> Self {
        use learning_utils::error::Error as Domain;

        match error {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Server(c, _) => *c,
            Error::Domain(Domain::NotFound(_)) => StatusCode::NOT_FOUND,
            Error::Domain(Domain::InvalidSchedule(_) | Domain::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            Error::Zoom(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
