use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use conversa_core::error::ConversaError;
use conversa_protocol::OutboundFrame;
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::http::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct NotifyBody {
    pub participant_id: String,
    #[serde(default)]
    pub data: Value,
}

/// POST /api/notify/{kind} — publish a frame directly, for callers outside
/// the normal `processInput` pipeline (e.g. a scheduled reminder).
/// `kind` is one of `message`, `dialogue_update`, `stream_response`.
pub async fn publish_notification(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(body): Json<NotifyBody>,
) -> Result<Json<Value>, ApiError> {
    let frame = match kind.as_str() {
        "message" => OutboundFrame::message(body.data),
        "dialogue_update" => OutboundFrame::dialogue_update(body.data),
        "stream_response" => OutboundFrame::stream_chunk(body.data),
        other => {
            return Err(ApiError(ConversaError::InvalidParameters(format!(
                "unknown notification kind: {other}"
            ))))
        }
    };
    state.notify.publish(&body.participant_id, frame);
    Ok(Json(serde_json::json!({"published": true})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::ConversaConfig;
    use conversa_store::Store;

    fn state() -> Arc<AppState> {
        let config = Arc::new(ConversaConfig::default());
        let store = Arc::new(Store::open_in_memory().unwrap());
        Arc::new(AppState::new(config, store))
    }

    #[tokio::test]
    async fn publishes_a_known_notification_kind() {
        let body = NotifyBody {
            participant_id: "p1".to_string(),
            data: serde_json::json!({"hello": "world"}),
        };
        let Json(result) =
            publish_notification(State(state()), Path("dialogue_update".to_string()), Json(body))
                .await
                .unwrap();
        assert_eq!(result["published"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn rejects_an_unknown_notification_kind() {
        let body = NotifyBody {
            participant_id: "p1".to_string(),
            data: serde_json::Value::Null,
        };
        let err = publish_notification(State(state()), Path("bogus".to_string()), Json(body))
            .await
            .unwrap_err();
        assert_eq!(err.0.code(), "INVALID_PARAMETERS");
    }
}
