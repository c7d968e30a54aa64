use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// Boundary stub for routes this system explicitly does not implement
/// (media upload/download, auth/login) — kept in the route table so a
/// client probing the contract surface gets a clear `501`, not a 404.
pub async fn not_implemented() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({
            "code": "NOT_IMPLEMENTED",
            "message": "this endpoint is out of scope for this deployment",
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_501_with_a_stable_error_code() {
        let (status, Json(body)) = not_implemented().await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["code"], json!("NOT_IMPLEMENTED"));
    }
}
