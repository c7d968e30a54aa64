use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use conversa_core::entities::{Dialogue, Message, Session, Turn};
use conversa_core::error::ConversaError;
use conversa_store::query::{DialogueFilter, MessageFilter, Page, Pagination, SessionFilter, TurnFilter};

use crate::app::AppState;
use crate::http::error::ApiError;

/// GET /api/query/dialogues
pub async fn query_dialogues(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<DialogueFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Dialogue>>, ApiError> {
    let page = state
        .store
        .list_dialogues(&filter, &pagination)
        .map_err(ConversaError::from)?;
    Ok(Json(page))
}

/// GET /api/query/sessions
pub async fn query_sessions(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<SessionFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Session>>, ApiError> {
    let page = state
        .store
        .list_sessions(&filter, &pagination)
        .map_err(ConversaError::from)?;
    Ok(Json(page))
}

/// GET /api/query/turns
pub async fn query_turns(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TurnFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Turn>>, ApiError> {
    let page = state
        .store
        .list_turns(&filter, &pagination)
        .map_err(ConversaError::from)?;
    Ok(Json(page))
}

/// GET /api/query/messages
pub async fn query_messages(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MessageFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Message>>, ApiError> {
    let page = state
        .store
        .list_messages(&filter, &pagination)
        .map_err(ConversaError::from)?;
    Ok(Json(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::types::DialogueType;
    use conversa_core::ConversaConfig;
    use conversa_orchestrator::NewDialogue;
    use conversa_store::Store;

    fn state() -> Arc<AppState> {
        let config = Arc::new(ConversaConfig::default());
        let store = Arc::new(Store::open_in_memory().unwrap());
        Arc::new(AppState::new(config, store))
    }

    #[tokio::test]
    async fn query_dialogues_is_empty_before_any_dialogue_exists() {
        let page = query_dialogues(
            State(state()),
            Query(DialogueFilter::default()),
            Query(Pagination::default()),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn query_messages_finds_the_inbound_message_after_process_input() {
        let app_state = state();
        let dialogue = app_state
            .dialogues
            .create_dialogue(NewDialogue {
                dialogue_type: DialogueType::HumanAi,
                human_id: Some("h1".to_string()),
                ai_id: Some("a1".to_string()),
                relation_id: None,
                title: None,
                description: None,
                metadata: serde_json::json!({}),
            })
            .unwrap();

        let envelope = conversa_input::InputEnvelope {
            dialogue_id: dialogue.id.to_string(),
            session_id: None,
            turn_id: None,
            sender_role: conversa_core::types::ParticipantRole::Human,
            sender_id: "h1".to_string(),
            content_type: "text".to_string(),
            content: serde_json::json!("hi"),
            metadata: serde_json::json!({}),
        };
        app_state.dialogues.process_input(envelope).await.unwrap();

        let page = query_messages(
            State(app_state),
            Query(MessageFilter {
                dialogue_id: Some(dialogue.id.to_string()),
                ..Default::default()
            }),
            Query(Pagination::default()),
        )
        .await
        .unwrap()
        .0;
        assert!(page.total >= 2);
    }
}
