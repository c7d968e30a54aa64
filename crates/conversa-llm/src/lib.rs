pub mod client;
pub mod error;
pub mod mock;
pub mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use mock::MockLlmClient;
pub use types::{
    CompletionOptions, CompletionResult, PromptSegment, Role, StreamChunkDelta, ToolRequest,
    ToolSpec,
};
