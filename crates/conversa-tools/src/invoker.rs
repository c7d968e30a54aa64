use std::sync::Arc;
use std::time::Duration;

use conversa_core::error::{ConversaError, Result as CoreResult};
use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

use crate::registry::ToolRegistry;
use crate::tool::ToolResult;

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches a tool invocation against the registry, enforcing parameter
/// validation, a per-call timeout, and at-most-one concurrent invocation
/// per `(dialogue_id, tool_id)` pair.
pub struct ToolInvoker {
    registry: ToolRegistry,
    locks: DashMap<(String, String), Arc<AsyncMutex<()>>>,
    timeout: Duration,
}

pub struct Invocation {
    pub result: ToolResult,
    pub latency_ms: u64,
}

impl ToolInvoker {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            locks: DashMap::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    #[instrument(skip(self, parameters), fields(dialogue_id, tool_id))]
    pub async fn invoke(
        &self,
        dialogue_id: &str,
        tool_id: &str,
        parameters: serde_json::Value,
    ) -> CoreResult<Invocation> {
        let tool = self
            .registry
            .get(tool_id)
            .ok_or_else(|| ConversaError::InvalidParameters(format!("unknown tool: {tool_id}")))?;

        tool.validate(&parameters)
            .map_err(ConversaError::InvalidParameters)?;

        let key = (dialogue_id.to_string(), tool_id.to_string());
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let started = std::time::Instant::now();
        let result = tokio::time::timeout(self.timeout, tool.invoke(parameters))
            .await
            .map_err(|_| ConversaError::ToolTimeout {
                tool: tool_id.to_string(),
                ms: self.timeout.as_millis() as u64,
            })?;
        let latency_ms = started.elapsed().as_millis() as u64;

        if result.is_error {
            warn!(tool_id, latency_ms, "tool invocation returned an error result");
        } else {
            info!(tool_id, latency_ms, "tool invocation succeeded");
        }

        Ok(Invocation { result, latency_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_tool_is_rejected_before_any_lock_is_taken() {
        let invoker = ToolInvoker::new(ToolRegistry::with_builtins());
        let err = invoker
            .invoke("d1", "nonexistent", serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETERS");
    }

    #[tokio::test]
    async fn invalid_parameters_are_rejected_before_execution() {
        let invoker = ToolInvoker::new(ToolRegistry::with_builtins());
        let err = invoker
            .invoke("d1", "weather", serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETERS");
    }

    #[tokio::test]
    async fn successful_invocation_reports_latency() {
        let invoker = ToolInvoker::new(ToolRegistry::with_builtins());
        let invocation = invoker
            .invoke("d1", "calculator", serde_json::json!({"a": 1, "op": "+", "b": 1}))
            .await
            .unwrap();
        assert!(!invocation.result.is_error);
        assert_eq!(invocation.result.content, "2");
    }
}
