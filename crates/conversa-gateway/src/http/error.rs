use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use conversa_core::error::ConversaError;
use serde_json::json;

/// Wraps `ConversaError` so handlers can return it directly from a
/// `Result` and get the wire `{code, message}` shape with the matching
/// HTTP status.
pub struct ApiError(pub ConversaError);

impl From<ConversaError> for ApiError {
    fn from(err: ConversaError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({
            "code": self.0.code(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
