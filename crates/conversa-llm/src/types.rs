use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One rendered prompt segment, as produced by context assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSegment {
    pub role: Role,
    pub content: String,
}

/// A tool call the model wants executed before it can finish responding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub call_id: String,
    pub tool_id: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub max_tokens: u32,
    pub available_tools: Vec<ToolSpec>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: "mock-1".to_string(),
            max_tokens: 1024,
            available_tools: Vec::new(),
        }
    }
}

/// Tool exposed to the model, as presented by `conversa-tools`'s registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub id: String,
    pub name: String,
    pub description: String,
    pub parameter_schema: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub text: String,
    pub tool_request: Option<ToolRequest>,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

#[derive(Debug, Clone)]
pub struct StreamChunkDelta {
    pub text: String,
    pub is_final: bool,
}
