use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{
    ContentType, CreatedBy, DialogueId, DialogueType, MessageId, ParticipantRole, SessionId,
    SessionType, ToolCallId, TurnId, TurnStatus,
};

/// Unique persistent container for one interaction line between a fixed
/// set of participants. Owns its Sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialogue {
    pub id: DialogueId,
    pub dialogue_type: DialogueType,
    pub human_id: Option<String>,
    pub ai_id: Option<String>,
    pub relation_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
    pub last_activity_at: String,
    pub is_active: bool,
    #[serde(default = "default_metadata")]
    pub metadata: Value,
}

impl Dialogue {
    /// `response_window_hours` override from metadata, if present.
    pub fn response_window_hours_override(&self) -> Option<i64> {
        self.metadata.get("response_window_hours")?.as_i64()
    }

    /// `session_idle_hours` override from metadata, if present.
    pub fn session_idle_hours_override(&self) -> Option<i64> {
        self.metadata.get("session_idle_hours")?.as_i64()
    }
}

/// A contiguous context segment inside a Dialogue. Owns its Turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub dialogue_id: DialogueId,
    pub session_type: SessionType,
    pub start_at: String,
    pub end_at: Option<String>,
    pub description: Option<String>,
    pub created_by: CreatedBy,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.end_at.is_none()
    }
}

/// A single initiator-to-responder interaction attempt. Owns its Messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub dialogue_id: DialogueId,
    pub session_id: SessionId,
    pub initiator_role: ParticipantRole,
    pub responder_role: ParticipantRole,
    pub started_at: String,
    pub closed_at: Option<String>,
    pub status: TurnStatus,
    pub deadline_at: String,
}

impl Turn {
    pub fn is_pending(&self) -> bool {
        matches!(self.status, TurnStatus::Pending)
    }

    /// Derived response time in whole seconds, when the Turn is resolved.
    pub fn response_time_secs(&self) -> Option<i64> {
        let closed = self.closed_at.as_ref()?;
        let started = chrono::DateTime::parse_from_rfc3339(&self.started_at).ok()?;
        let closed = chrono::DateTime::parse_from_rfc3339(closed).ok()?;
        Some((closed - started).num_seconds())
    }
}

/// The atomic unit of communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub dialogue_id: DialogueId,
    pub session_id: SessionId,
    pub turn_id: TurnId,
    pub sender_role: ParticipantRole,
    pub sender_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub created_at: String,
    #[serde(default = "default_metadata")]
    pub metadata: Value,
}

impl Message {
    pub fn reply_to(&self) -> Option<&str> {
        self.metadata.get("reply_to")?.as_str()
    }

    pub fn is_partial(&self) -> bool {
        self.metadata
            .get("partial")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Append-only record of a single tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: ToolCallId,
    pub dialogue_id: DialogueId,
    pub turn_id: TurnId,
    pub tool_id: String,
    pub parameters: Value,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub latency_ms: u64,
    pub created_at: String,
}

/// Append-only pipeline trace entry, used for diagnosing recovered failures
/// that were not surfaced to the caller as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: crate::types::EventLogId,
    pub dialogue_id: DialogueId,
    pub turn_id: Option<TurnId>,
    pub kind: String,
    pub detail: Value,
    pub created_at: String,
}

/// One step of a self-reflection pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionStep {
    pub purpose: String,
    pub tool_used: Option<String>,
    pub tool_input: Option<Value>,
    pub tool_output: Option<Value>,
    pub mood_shift: Option<String>,
    pub generated_entry: Option<String>,
    pub failed: bool,
}

/// A goal-driven self-reflection run within an `ai_self` Dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionSession {
    pub id: crate::types::IntrospectionSessionId,
    pub dialogue_id: DialogueId,
    pub session_id: SessionId,
    pub goal: String,
    pub steps: Vec<IntrospectionStep>,
    pub summary: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// A named multi-agent task and its participant list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationSession {
    pub id: crate::types::CollaborationSessionId,
    pub dialogue_id: DialogueId,
    pub task: String,
    pub participants: Vec<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

fn default_metadata() -> Value {
    Value::Object(serde_json::Map::new())
}
