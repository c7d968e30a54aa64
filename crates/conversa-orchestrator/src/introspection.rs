use std::sync::Arc;

use chrono::Utc;
use conversa_core::entities::{IntrospectionSession, IntrospectionStep};
use conversa_core::error::Result;
use conversa_core::types::{DialogueId, IntrospectionSessionId, SessionId};
use conversa_store::Store;
use conversa_tools::ToolInvoker;
use serde_json::Value;
use tracing::{instrument, warn};

/// One planned step of a self-reflection run: a purpose statement plus the
/// tool call (if any) that fulfills it.
pub struct PlannedStep {
    pub purpose: String,
    pub tool_id: Option<String>,
    pub tool_input: Option<Value>,
    pub mood_shift: Option<String>,
}

/// Drives a `self_reflection` Session within an `ai_self` Dialogue: runs a
/// goal's planned steps in order, recording each as an `IntrospectionStep`.
/// A step failure is recorded and the run continues — there is no rollback.
pub struct IntrospectionEngine {
    store: Arc<Store>,
    invoker: Arc<ToolInvoker>,
}

impl IntrospectionEngine {
    pub fn new(store: Arc<Store>, invoker: Arc<ToolInvoker>) -> Self {
        Self { store, invoker }
    }

    #[instrument(skip(self, plan))]
    pub async fn run(
        &self,
        dialogue_id: DialogueId,
        session_id: SessionId,
        goal: &str,
        plan: Vec<PlannedStep>,
    ) -> Result<IntrospectionSession> {
        let session = IntrospectionSession {
            id: IntrospectionSessionId::new(),
            dialogue_id: dialogue_id.clone(),
            session_id,
            goal: goal.to_string(),
            steps: Vec::new(),
            summary: None,
            created_at: Utc::now().to_rfc3339(),
            completed_at: None,
        };
        self.store
            .insert_introspection_session(&session)
            .map_err(conversa_core::ConversaError::from)?;

        let mut steps = Vec::with_capacity(plan.len());
        for planned in plan {
            steps.push(self.run_step(&dialogue_id, planned).await);
        }

        let failed_count = steps.iter().filter(|s| s.failed).count();
        let summary = format!(
            "completed {} of {} steps ({} failed)",
            steps.len() - failed_count,
            steps.len(),
            failed_count
        );
        let completed_at = Utc::now().to_rfc3339();
        self.store
            .update_introspection_steps(&session.id, &steps, Some(&summary), Some(&completed_at))
            .map_err(conversa_core::ConversaError::from)?;

        Ok(IntrospectionSession {
            steps,
            summary: Some(summary),
            completed_at: Some(completed_at),
            ..session
        })
    }

    async fn run_step(&self, dialogue_id: &DialogueId, planned: PlannedStep) -> IntrospectionStep {
        let Some(tool_id) = &planned.tool_id else {
            return IntrospectionStep {
                purpose: planned.purpose,
                tool_used: None,
                tool_input: None,
                tool_output: None,
                mood_shift: planned.mood_shift,
                generated_entry: None,
                failed: false,
            };
        };

        let parameters = planned.tool_input.clone().unwrap_or(Value::Null);
        match self
            .invoker
            .invoke(dialogue_id.as_str(), tool_id, parameters.clone())
            .await
        {
            Ok(invocation) if !invocation.result.is_error => IntrospectionStep {
                purpose: planned.purpose,
                tool_used: Some(tool_id.clone()),
                tool_input: Some(parameters),
                tool_output: Some(Value::String(invocation.result.content.clone())),
                mood_shift: planned.mood_shift,
                generated_entry: Some(invocation.result.content),
                failed: false,
            },
            Ok(invocation) => {
                warn!(tool_id, "introspection step tool call returned an error");
                IntrospectionStep {
                    purpose: planned.purpose,
                    tool_used: Some(tool_id.clone()),
                    tool_input: Some(parameters),
                    tool_output: Some(Value::String(invocation.result.content)),
                    mood_shift: planned.mood_shift,
                    generated_entry: None,
                    failed: true,
                }
            }
            Err(err) => {
                warn!(tool_id, error = %err, "introspection step tool call failed");
                IntrospectionStep {
                    purpose: planned.purpose,
                    tool_used: Some(tool_id.clone()),
                    tool_input: Some(parameters),
                    tool_output: None,
                    mood_shift: planned.mood_shift,
                    generated_entry: None,
                    failed: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_tools::ToolRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn a_failing_step_is_recorded_but_the_run_continues() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let invoker = Arc::new(ToolInvoker::new(ToolRegistry::with_builtins()));
        let engine = IntrospectionEngine::new(store, invoker);

        let plan = vec![
            PlannedStep {
                purpose: "try an unknown tool".to_string(),
                tool_id: Some("nonexistent".to_string()),
                tool_input: Some(json!({})),
                mood_shift: None,
            },
            PlannedStep {
                purpose: "evaluate a known expression".to_string(),
                tool_id: Some("calculator".to_string()),
                tool_input: Some(json!({"a": 2, "op": "+", "b": 2})),
                mood_shift: Some("satisfied".to_string()),
            },
        ];

        let result = engine
            .run(DialogueId::new(), SessionId::new(), "weekly_review", plan)
            .await
            .unwrap();

        assert_eq!(result.steps.len(), 2);
        assert!(result.steps[0].failed);
        assert!(!result.steps[1].failed);
        assert_eq!(result.steps[1].generated_entry.as_deref(), Some("4"));
        assert!(result.summary.unwrap().contains("1 failed"));
    }
}
