use async_trait::async_trait;

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::types::{CompletionOptions, CompletionResult, PromptSegment, Role, ToolRequest};

/// Deterministic stand-in for a real vendor backend. Recognizes a single
/// "do I need an umbrella" style weather question and requests the
/// `weather` tool for it exactly once per Turn; otherwise it echoes an
/// acknowledgement of the last user segment. Good enough to drive the
/// tool loop and response pipeline in tests without a network call.
pub struct MockLlmClient;

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        prompt: &[PromptSegment],
        _options: &CompletionOptions,
    ) -> Result<CompletionResult, LlmError> {
        let already_has_tool_result = prompt.iter().any(|seg| {
            seg.role == Role::User && seg.content.contains("[tool_output:weather]")
        });

        let last_user = prompt
            .iter()
            .rev()
            .find(|seg| seg.role == Role::User)
            .map(|seg| seg.content.as_str())
            .unwrap_or("");

        if !already_has_tool_result && mentions_weather(last_user) {
            let city = extract_city(last_user).unwrap_or_else(|| "your area".to_string());
            return Ok(CompletionResult {
                text: String::new(),
                tool_request: Some(ToolRequest {
                    call_id: "call-1".to_string(),
                    tool_id: "weather".to_string(),
                    parameters: serde_json::json!({ "city": city, "date": "tomorrow" }),
                }),
                tokens_in: prompt.iter().map(|s| s.content.len() as u32 / 4).sum(),
                tokens_out: 0,
            });
        }

        if already_has_tool_result {
            let summary = prompt
                .iter()
                .rev()
                .find(|seg| seg.content.contains("[tool_output:weather]"))
                .map(|seg| seg.content.clone())
                .unwrap_or_default();
            return Ok(CompletionResult {
                text: format!("Based on the forecast, here's what I found: {summary}"),
                tool_request: None,
                tokens_in: prompt.iter().map(|s| s.content.len() as u32 / 4).sum(),
                tokens_out: 24,
            });
        }

        Ok(CompletionResult {
            text: format!("Acknowledged: {last_user}"),
            tool_request: None,
            tokens_in: prompt.iter().map(|s| s.content.len() as u32 / 4).sum(),
            tokens_out: last_user.len() as u32 / 4,
        })
    }
}

fn mentions_weather(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("weather") || lower.contains("umbrella")
}

fn extract_city(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let idx = lower.find(" in ")?;
    let rest = &text[idx + 4..];
    let city: String = rest
        .split(|c: char| c == '?' || c == '.' || c == ',')
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    if city.is_empty() {
        None
    } else {
        Some(city)
    }
}
