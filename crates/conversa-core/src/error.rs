use thiserror::Error;

/// The full error-kind taxonomy surfaced by the orchestration core.
///
/// Each variant maps to a stable `code()` string so the gateway can
/// translate failures into the wire `{code, message}` shape without a
/// central match statement scattered across handlers.
#[derive(Debug, Error)]
pub enum ConversaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("unsupported modality: {0}")]
    UnsupportedModality(String),

    #[error("dialogue not found: {id}")]
    DialogueNotFound { id: String },

    #[error("dialogue is closed: {id}")]
    DialogueClosed { id: String },

    #[error("turn is closed: {id}")]
    TurnClosed { id: String },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("tool '{tool}' timed out after {ms}ms")]
    ToolTimeout { tool: String, ms: u64 },

    #[error("tool '{tool}' failed: {reason}")]
    ToolFailure { tool: String, reason: String },

    #[error("llm call timed out after {ms}ms")]
    LLMTimeout { ms: u64 },

    #[error("llm call failed: {0}")]
    LLMFailure(String),

    #[error("context overflow: {used} exceeds budget {budget}")]
    ContextOverflow { used: usize, budget: usize },

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ConversaError {
    /// Short error code string sent to clients in REST/WS error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            ConversaError::InvalidInput(_) => "INVALID_INPUT",
            ConversaError::InvalidReference(_) => "INVALID_REFERENCE",
            ConversaError::UnsupportedModality(_) => "UNSUPPORTED_MODALITY",
            ConversaError::DialogueNotFound { .. } => "DIALOGUE_NOT_FOUND",
            ConversaError::DialogueClosed { .. } => "DIALOGUE_CLOSED",
            ConversaError::TurnClosed { .. } => "TURN_CLOSED",
            ConversaError::InvalidParameters(_) => "INVALID_PARAMETERS",
            ConversaError::ToolTimeout { .. } => "TOOL_TIMEOUT",
            ConversaError::ToolFailure { .. } => "TOOL_FAILURE",
            ConversaError::LLMTimeout { .. } => "LLM_TIMEOUT",
            ConversaError::LLMFailure(_) => "LLM_FAILURE",
            ConversaError::ContextOverflow { .. } => "CONTEXT_OVERFLOW",
            ConversaError::StorageFailure(_) => "STORAGE_FAILURE",
            ConversaError::NotFound(_) => "NOT_FOUND",
            ConversaError::Unauthorized(_) => "UNAUTHORIZED",
            ConversaError::Config(_) => "CONFIG_ERROR",
            ConversaError::Serialization(_) => "SERIALIZATION_ERROR",
            ConversaError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status this error kind maps to at the gateway boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            ConversaError::InvalidInput(_)
            | ConversaError::InvalidReference(_)
            | ConversaError::UnsupportedModality(_)
            | ConversaError::InvalidParameters(_)
            | ConversaError::Serialization(_) => 400,
            ConversaError::Unauthorized(_) => 401,
            ConversaError::DialogueNotFound { .. } | ConversaError::NotFound(_) => 404,
            ConversaError::DialogueClosed { .. } | ConversaError::TurnClosed { .. } => 409,
            ConversaError::ContextOverflow { .. } => 413,
            ConversaError::ToolTimeout { .. } | ConversaError::LLMTimeout { .. } => 504,
            ConversaError::ToolFailure { .. }
            | ConversaError::LLMFailure(_)
            | ConversaError::StorageFailure(_)
            | ConversaError::Config(_)
            | ConversaError::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConversaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_stable_code() {
        let err = ConversaError::DialogueNotFound {
            id: "d1".to_string(),
        };
        assert_eq!(err.code(), "DIALOGUE_NOT_FOUND");
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn tool_timeout_reports_the_tool_name() {
        let err = ConversaError::ToolTimeout {
            tool: "weather".to_string(),
            ms: 5000,
        };
        assert!(err.to_string().contains("weather"));
    }
}
