use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server → Client frame.
/// Wire: `{ "type": "message", "data": {...}, "timestamp": "2026-…" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundFrame {
    #[serde(rename = "type")]
    pub frame_type: OutboundFrameType,
    pub data: Value,
    pub timestamp: String,
}

impl OutboundFrame {
    pub fn new(frame_type: OutboundFrameType, data: impl Serialize) -> Self {
        Self {
            frame_type,
            data: serde_json::to_value(data).unwrap_or(Value::Null),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn message(data: impl Serialize) -> Self {
        Self::new(OutboundFrameType::Message, data)
    }

    pub fn dialogue_update(data: impl Serialize) -> Self {
        Self::new(OutboundFrameType::DialogueUpdate, data)
    }

    pub fn stream_chunk(data: impl Serialize) -> Self {
        Self::new(OutboundFrameType::StreamChunk, data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundFrameType {
    Message,
    DialogueUpdate,
    StreamChunk,
}

/// Client → Server frame.
/// Wire: `{ "action": "input", "data": {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundFrame {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

/// A streamed partial chunk of assistant output, carried as the `data` of a
/// `stream_chunk` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub dialogue_id: String,
    pub turn_id: String,
    pub delta: String,
    pub is_final: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_frame_carries_the_type_tag_and_a_timestamp() {
        let frame = OutboundFrame::message(serde_json::json!({"id": "m1"}));
        let encoded = serde_json::to_value(&frame).unwrap();
        assert_eq!(encoded["type"], "message");
        assert!(encoded["timestamp"].is_string());
    }

    #[test]
    fn inbound_frame_deserializes_with_missing_data() {
        let raw = r#"{"action":"ping"}"#;
        let frame: InboundFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.action, "ping");
        assert!(frame.data.is_null());
    }
}
