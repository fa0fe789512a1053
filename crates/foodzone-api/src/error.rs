//! Mapping from domain errors to HTTP responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use foodzone_core::Error;
use serde_json::{Map, Value};
use tracing::error;

/// Which boolean flag leads a failure body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `{success:false, error, hint?}`
    Success,
    /// `{valid:false, error}`
    Valid,
    /// `{exists:false, error}`
    Exists,
    /// `{error}`
    Bare,
}

impl Envelope {
    fn flag(&self) -> Option<&'static str> {
        match self {
            Envelope::Success => Some("success"),
            Envelope::Valid => Some("valid"),
            Envelope::Exists => Some("exists"),
            Envelope::Bare => None,
        }
    }
}

/// An error on its way to becoming a JSON response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    hint: Option<String>,
    envelope: Envelope,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            hint: None,
            envelope: Envelope::Success,
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized").envelope(Envelope::Bare)
    }

    pub fn envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_client_error() {
            let hint = err.hint().map(str::to_string);
            return Self {
                hint,
                ..Self::new(StatusCode::BAD_REQUEST, err.to_string())
            };
        }
        match err {
            Error::Unauthorized => Self::unauthorized(),
            other => {
                error!(error = %other, "Request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        if let Some(flag) = self.envelope.flag() {
            body.insert(flag.to_string(), Value::Bool(false));
        }
        body.insert("error".to_string(), Value::String(self.message));
        if let Some(hint) = self.hint {
            body.insert("hint".to_string(), Value::String(hint));
        }
        (self.status, Json(Value::Object(body))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::Validation("x".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("x".into()), StatusCode::BAD_REQUEST),
            (Error::Expired, StatusCode::BAD_REQUEST),
            (Error::DuplicateKey("x".into()), StatusCode::BAD_REQUEST),
            (Error::Unauthorized, StatusCode::UNAUTHORIZED),
            (Error::Database("locked".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[tokio::test]
    async fn test_conflict_body_carries_hint() {
        let err = ApiError::from(Error::Conflict {
            message: "License already activated on another device".into(),
            hint: Some("Contact support to transfer license".into()),
        });
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "error": "License already activated on another device",
                "hint": "Contact support to transfer license",
            })
        );
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_leaked() {
        let err = ApiError::from(Error::Database("disk I/O error at /var/lib".into()))
            .envelope(Envelope::Valid);
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            serde_json::json!({"valid": false, "error": "Internal server error"})
        );
    }

    #[tokio::test]
    async fn test_unauthorized_body() {
        let (status, body) = body_of(ApiError::unauthorized()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({"error": "Unauthorized"}));
    }
}
