use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use conversa_input::InputEnvelope;
use conversa_protocol::{InboundFrame, OutboundFrame};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use crate::app::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

/// GET /ws?user_id=…&token=… — upgrade to a WebSocket connection.
///
/// Auth here is a plain query-string token check; the auth provider itself
/// is external to this system, so there is no challenge/nonce handshake —
/// a connection either presents a token or is refused at upgrade time.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, query))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>, query: WsQuery) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let participant_id = query.user_id.unwrap_or_else(|| conn_id.clone());

    if query.token.as_deref().unwrap_or("").is_empty() {
        warn!(conn_id, "WS connection refused: missing token");
        return;
    }

    info!(conn_id, participant_id, "WS connection established");

    let (mut tx, mut rx) = socket.split();
    let mut broadcast_rx = state.notify.subscribe();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound(&conn_id, &participant_id, &text, &state).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        warn!(conn_id, error = %err, "WS read error");
                        break;
                    }
                    _ => {}
                }
            }

            frame = broadcast_rx.recv() => {
                if let Ok(frame) = frame {
                    if send_frame(&mut tx, &frame).await.is_err() {
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!(conn_id, "WS connection closed");
}

/// Handle one inbound `{action, data}` frame. The only action this surface
/// accepts today is `input`, carrying an `InputEnvelope`; anything else is
/// logged and dropped rather than closing the connection.
async fn handle_inbound(conn_id: &str, participant_id: &str, text: &str, state: &Arc<AppState>) {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(err) => {
            warn!(conn_id, error = %err, "malformed WS frame");
            return;
        }
    };

    match frame.action.as_str() {
        "input" => {
            let envelope: InputEnvelope = match serde_json::from_value(frame.data) {
                Ok(e) => e,
                Err(err) => {
                    warn!(conn_id, error = %err, "invalid input envelope");
                    return;
                }
            };
            if let Err(err) = state.dialogues.process_input(envelope).await {
                warn!(conn_id, error = %err, "process_input failed");
            }
        }
        other => {
            warn!(conn_id, participant_id, action = other, "unhandled WS action");
        }
    }
}

async fn send_frame(
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    frame: &OutboundFrame,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).unwrap_or_default();
    tx.send(Message::Text(json.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::types::DialogueType;
    use conversa_core::ConversaConfig;
    use conversa_orchestrator::NewDialogue;
    use conversa_store::query::{MessageFilter, Pagination};
    use conversa_store::Store;
    use serde_json::json;

    fn state() -> Arc<AppState> {
        let config = Arc::new(ConversaConfig::default());
        let store = Arc::new(Store::open_in_memory().unwrap());
        Arc::new(AppState::new(config, store))
    }

    #[test]
    fn ws_query_defaults_both_fields_to_none() {
        let query: WsQuery = serde_json::from_str("{}").unwrap();
        assert!(query.user_id.is_none());
        assert!(query.token.is_none());
    }

    #[tokio::test]
    async fn handle_inbound_processes_an_input_action_and_persists_a_message() {
        let state = state();
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

        let frame = json!({
            "action": "input",
            "data": {
                "dialogue_id": dialogue.id.to_string(),
                "session_id": null,
                "turn_id": null,
                "sender_role": "human",
                "sender_id": "h1",
                "content_type": "text",
                "content": "hello over websocket",
                "metadata": {},
            }
        });

        handle_inbound("conn-1", "h1", &frame.to_string(), &state).await;

        let page = state
            .store
            .list_messages(
                &MessageFilter {
                    dialogue_id: Some(dialogue.id.to_string()),
                    ..Default::default()
                },
                &Pagination::default(),
            )
            .unwrap();
        assert!(page.total >= 1);
    }

    #[tokio::test]
    async fn handle_inbound_ignores_an_unrecognized_action() {
        let state = state();
        let frame = json!({"action": "ping", "data": {}});
        handle_inbound("conn-1", "unused", &frame.to_string(), &state).await;
    }
}
