use conversa_core::types::{ContentType, ParticipantRole};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The raw inbound payload, as accepted at `POST /api/input` or a WS
/// `{"action":"input", ...}` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputEnvelope {
    pub dialogue_id: String,
    pub session_id: Option<String>,
    pub turn_id: Option<String>,
    pub sender_role: ParticipantRole,
    pub sender_id: String,
    pub content_type: String,
    pub content: Value,
    #[serde(default)]
    pub metadata: Value,
}

impl InputEnvelope {
    pub fn parsed_content_type(&self) -> Option<ContentType> {
        self.content_type.parse().ok()
    }
}
