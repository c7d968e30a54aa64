use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($name:ident) => {
        /// Time-sortable persisted identifier (UUIDv7).
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

entity_id!(DialogueId);
entity_id!(SessionId);
entity_id!(TurnId);
entity_id!(MessageId);
entity_id!(ToolCallId);
entity_id!(EventLogId);
entity_id!(IntrospectionSessionId);
entity_id!(CollaborationSessionId);

/// Per-connection identifier, never persisted — random (UUIDv4 gives no
/// ordering guarantee, which is the point; connections aren't rows).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub String);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The seven supported participant topologies for a Dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueType {
    HumanAi,
    AiSelf,
    AiAi,
    HumanHumanPrivate,
    HumanHumanGroup,
    HumanAiGroup,
    AiMultiHuman,
}

impl fmt::Display for DialogueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DialogueType::HumanAi => "human_ai",
            DialogueType::AiSelf => "ai_self",
            DialogueType::AiAi => "ai_ai",
            DialogueType::HumanHumanPrivate => "human_human_private",
            DialogueType::HumanHumanGroup => "human_human_group",
            DialogueType::HumanAiGroup => "human_ai_group",
            DialogueType::AiMultiHuman => "ai_multi_human",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for DialogueType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "human_ai" => Ok(Self::HumanAi),
            "ai_self" => Ok(Self::AiSelf),
            "ai_ai" => Ok(Self::AiAi),
            "human_human_private" => Ok(Self::HumanHumanPrivate),
            "human_human_group" => Ok(Self::HumanHumanGroup),
            "human_ai_group" => Ok(Self::HumanAiGroup),
            "ai_multi_human" => Ok(Self::AiMultiHuman),
            other => Err(format!("unknown dialogue type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Dialogue,
    SelfReflection,
}

/// Who (or what) opened a Session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedBy {
    System,
    Ai,
    Human,
}

/// A role a Message sender, a Turn initiator, or a Turn responder can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Human,
    Ai,
    System,
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParticipantRole::Human => "human",
            ParticipantRole::Ai => "ai",
            ParticipantRole::System => "system",
        };
        write!(f, "{s}")
    }
}

/// Turn lifecycle state. See `conversa-orchestrator::turn` for the transition
/// function; terminal states (`Responded`, `Unresponded`) are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Pending,
    Responded,
    Unresponded,
}

/// The eleven content modalities a Message may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Image,
    Audio,
    ToolInput,
    ToolOutput,
    SystemContext,
    Prompt,
    Markdown,
    QuoteReply,
    Command,
    Unknown,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Audio => "audio",
            ContentType::ToolInput => "tool_input",
            ContentType::ToolOutput => "tool_output",
            ContentType::SystemContext => "system_context",
            ContentType::Prompt => "prompt",
            ContentType::Markdown => "markdown",
            ContentType::QuoteReply => "quote_reply",
            ContentType::Command => "command",
            ContentType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            "tool_input" => Ok(Self::ToolInput),
            "tool_output" => Ok(Self::ToolOutput),
            "system_context" => Ok(Self::SystemContext),
            "prompt" => Ok(Self::Prompt),
            "markdown" => Ok(Self::Markdown),
            "quote_reply" => Ok(Self::QuoteReply),
            "command" => Ok(Self::Command),
            other => Err(format!("unsupported content type: {other}")),
        }
    }
}
