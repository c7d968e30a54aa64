use axum::{extract::State, Json};
use conversa_input::InputEnvelope;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;
use crate::http::error::ApiError;

/// POST /api/input — accepts an inbound envelope and runs it through the
/// full input → context → LLM → tool-loop → response → persist pipeline.
pub async fn submit_input(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<InputEnvelope>,
) -> Result<Json<Value>, ApiError> {
    let result = state.dialogues.process_input(envelope).await?;

    let body = match result.assistant_message {
        Some(assistant) => json!({
            "message_id": assistant.id,
            "status": "responded",
            "content": assistant.content,
            "content_type": assistant.content_type,
        }),
        None => json!({
            "message_id": result.inbound_message.id,
            "status": "received",
            "content": Value::Null,
            "content_type": Value::Null,
        }),
    };

    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::types::{DialogueType, ParticipantRole};
    use conversa_core::ConversaConfig;
    use conversa_orchestrator::NewDialogue;
    use conversa_store::Store;

    #[tokio::test]
    async fn submit_input_returns_a_responded_message() {
        let config = Arc::new(ConversaConfig::default());
        let store = Arc::new(Store::open_in_memory().unwrap());
        let state = Arc::new(AppState::new(config, store));

        let dialogue = state
            .dialogues
            .create_dialogue(NewDialogue {
                dialogue_type: DialogueType::HumanAi,
                human_id: Some("h1".to_string()),
                ai_id: Some("a1".to_string()),
                relation_id: None,
                title: None,
                description: None,
                metadata: json!({}),
            })
            .unwrap();

        let envelope = InputEnvelope {
            dialogue_id: dialogue.id.to_string(),
            session_id: None,
            turn_id: None,
            sender_role: ParticipantRole::Human,
            sender_id: "h1".to_string(),
            content_type: "text".to_string(),
            content: json!("hello"),
            metadata: json!({}),
        };

        let Json(body) = submit_input(State(state), Json(envelope)).await.unwrap();
        assert_eq!(body["status"], json!("responded"));
    }
}
