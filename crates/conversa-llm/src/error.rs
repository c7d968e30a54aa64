use conversa_core::ConversaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm call timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("llm call failed: {0}")]
    Failed(String),
}

impl From<LlmError> for ConversaError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout { ms } => ConversaError::LLMTimeout { ms },
            LlmError::Failed(reason) => ConversaError::LLMFailure(reason),
        }
    }
}
