use conversa_core::entities::Message;
use conversa_core::error::Result;
use conversa_core::types::{ContentType, ParticipantRole, SessionId};
use conversa_llm::{PromptSegment, Role};
use conversa_store::Store;
use tracing::instrument;

/// Assembles an ordered prompt from the recent Messages of a Session plus a
/// fixed system-instruction header, respecting a character budget.
///
/// Truncation drops the oldest Messages first and never splits one in half;
/// tool-result Messages are labeled with a structured marker so the model
/// can distinguish them from organic conversation turns.
pub struct ContextBuilder<'a> {
    store: &'a Store,
    budget_chars: usize,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(store: &'a Store, budget_chars: usize) -> Self {
        Self { store, budget_chars }
    }

    #[instrument(skip(self, system_instructions), fields(session_id = %session_id))]
    pub fn build(
        &self,
        session_id: &SessionId,
        system_instructions: &[String],
    ) -> Result<Vec<PromptSegment>> {
        let header_len: usize = system_instructions.iter().map(|s| s.len()).sum();
        let remaining_budget = self.budget_chars.saturating_sub(header_len);

        // Over-fetch a generous window, then trim to budget below. A Session
        // rarely holds more than a few hundred Messages in practice.
        let recent = self
            .store
            .recent_messages_for_session(session_id, 500)
            .map_err(conversa_core::ConversaError::from)?;

        let projected: Vec<(Message, String)> = recent
            .into_iter()
            .map(|m| {
                let text = project(&m);
                (m, text)
            })
            .collect();

        let mut kept_rev: Vec<&(Message, String)> = Vec::new();
        let mut used = 0usize;
        for entry in projected.iter().rev() {
            let len = entry.1.len();
            if used + len > remaining_budget && !kept_rev.is_empty() {
                break;
            }
            used += len;
            kept_rev.push(entry);
        }
        kept_rev.reverse();

        let mut segments: Vec<PromptSegment> = system_instructions
            .iter()
            .map(|s| PromptSegment {
                role: Role::System,
                content: s.clone(),
            })
            .collect();

        for (message, text) in kept_rev {
            segments.push(PromptSegment {
                role: role_to_llm_role(message.sender_role),
                content: text,
            });
        }

        Ok(segments)
    }
}

fn role_to_llm_role(role: ParticipantRole) -> Role {
    match role {
        ParticipantRole::Ai => Role::Assistant,
        ParticipantRole::Human | ParticipantRole::System => Role::User,
    }
}

/// Project a persisted Message to its text form for prompt inclusion.
/// Tool-output Messages get a structured marker prefix so the model (and
/// the mock backend) can tell them apart from organic turns.
fn project(message: &Message) -> String {
    match message.content_type {
        ContentType::ToolOutput => {
            let tool = message
                .metadata
                .get("tool_used")
                .and_then(|v| v.as_str())
                .unwrap_or("tool");
            format!("[tool_output:{tool}] {}", message.content)
        }
        _ => message.content.clone(),
    }
}
