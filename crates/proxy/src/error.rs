//! API error type that maps [`BridgeError`] variants to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bridge_types::BridgeError;
use serde_json::json;

/// Wrapper around [`BridgeError`] that implements [`IntoResponse`].
pub struct ApiError(pub BridgeError);

impl ApiError {
    /// Returns `(status, error_type, error_code)` for the wrapped error.
    fn classify(&self) -> (StatusCode, &'static str, &'static str) {
        match &self.0 {
            BridgeError::Auth(_) => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "not_authenticated",
            ),
            BridgeError::AuthRejected(_) => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "oauth_token_rejected",
            ),
            BridgeError::UnsupportedModel(_) => (
                StatusCode::NOT_FOUND,
                "invalid_request_error",
                "model_not_supported_by_proxy",
            ),
            BridgeError::Translation(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "translation_error",
            ),
            BridgeError::Upstream { status, .. } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                "upstream_error",
                "upstream_error",
            ),
            BridgeError::Http(_) => (StatusCode::BAD_GATEWAY, "server_error", "upstream_unreachable"),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "internal_error",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, error_code) = self.classify();
        let msg = self.0.to_string();
        (status, error_json(error_type, error_code, &msg)).into_response()
    }
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        Self(e)
    }
}

/// OpenAI-style error body.
pub fn error_json(error_type: &str, code: &str, message: &str) -> Json<serde_json::Value> {
    Json(json!({
        "error": {
            "message": message,
            "type": error_type,
            "code": code,
        }
    }))
}

/// Build a full error response in one call.
pub fn error_response(status: StatusCode, error_type: &str, code: &str, message: &str) -> Response {
    (status, error_json(error_type, code, message)).into_response()
}
