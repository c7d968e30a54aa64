use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::LlmError;
use crate::types::{CompletionOptions, CompletionResult, PromptSegment, StreamChunkDelta};

/// Common interface every LLM backend implements. The orchestrator only
/// ever talks to this trait, never to a concrete provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &str;

    /// Non-streaming completion: wait for the full response.
    async fn complete(
        &self,
        prompt: &[PromptSegment],
        options: &CompletionOptions,
    ) -> Result<CompletionResult, LlmError>;

    /// Streamed completion. Default falls back to `complete` and emits the
    /// whole response as a single final chunk, mirroring how a provider
    /// without native streaming support would be adapted.
    async fn stream(
        &self,
        prompt: &[PromptSegment],
        options: &CompletionOptions,
        tx: mpsc::Sender<StreamChunkDelta>,
    ) -> Result<CompletionResult, LlmError> {
        let result = self.complete(prompt, options).await?;
        let _ = tx
            .send(StreamChunkDelta {
                text: result.text.clone(),
                is_final: true,
            })
            .await;
        Ok(result)
    }
}
