use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{HeaderMap, header::CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

/// `axum::Json` with rejections reported through [`Error`], so malformed bodies get the
/// same `{error, received}` reply as any other bad request.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json_content = has_json_content_type(req.headers());
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| Error::Server(rejection.status(), rejection.body_text()))?;

        if !json_content {
            return Err(Error::bad_request(
                "Expected request with Content-Type: application/json",
                received(&bytes),
            ));
        }

        let axum::Json(value) = axum::Json::<T>::from_bytes(&bytes)
            .map_err(|rejection| Error::bad_request(rejection.body_text(), received(&bytes)))?;
        Ok(JsonBody(value))
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// The body as JSON when it parses, otherwise as text
fn received(bytes: &Bytes) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn json_content_types() {
        assert!(has_json_content_type(&headers("application/json")));
        assert!(has_json_content_type(&headers("application/json; charset=utf-8")));
        assert!(has_json_content_type(&headers("application/vnd.api+json")));
        assert!(!has_json_content_type(&headers("text/plain")));
        assert!(!has_json_content_type(&HeaderMap::new()));
    }

    #[test]
    fn unparsable_body_is_echoed_as_text() {
        let bytes = Bytes::from_static(b"{\"questionId\": ");
        assert_eq!(received(&bytes), Value::String("{\"questionId\": ".into()));
        let bytes = Bytes::from_static(b"{\"answerIndex\": \"1\"}");
        assert_eq!(received(&bytes)["answerIndex"], "1");
    }
}
