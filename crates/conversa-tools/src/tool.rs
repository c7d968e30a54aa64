use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }
}

/// A single callable capability exposed to the orchestrator's tool loop.
#[async_trait]
pub trait Tool: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn category(&self) -> &str;
    fn description(&self) -> &str;
    fn parameter_schema(&self) -> serde_json::Value;

    /// Validate `parameters` against this tool's schema before execution.
    /// The default checks only that declared required fields are present;
    /// a tool with stricter needs can override this.
    fn validate(&self, parameters: &serde_json::Value) -> Result<(), String> {
        let schema = self.parameter_schema();
        let Some(required) = schema.get("required").and_then(|v| v.as_array()) else {
            return Ok(());
        };
        for field in required {
            let Some(name) = field.as_str() else { continue };
            if parameters.get(name).is_none() {
                return Err(format!("missing required parameter: {name}"));
            }
        }
        Ok(())
    }

    async fn invoke(&self, parameters: serde_json::Value) -> ToolResult;
}
