use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use conversa_core::entities::{Dialogue, EventLogEntry, Message, ToolCall};
use conversa_core::error::{ConversaError, Result};
use conversa_core::types::{
    ContentType, DialogueId, DialogueType, EventLogId, MessageId, ParticipantRole, SessionId, ToolCallId,
    TurnId,
};
use conversa_core::ConversaConfig;
use conversa_context::ContextBuilder;
use conversa_input::{InputEnvelope, InputParser};
use conversa_llm::{CompletionOptions, LlmClient};
use conversa_notify::NotificationHub;
use conversa_protocol::OutboundFrame;
use conversa_store::Store;
use conversa_tools::ToolInvoker;
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{instrument, warn};

use crate::mixer::{ResponseMixer, ToolCitation};
use crate::session::SessionManager;
use crate::turn::TurnManager;

/// Outcome of a single `process_input` call.
pub struct AssistantResult {
    pub dialogue_id: DialogueId,
    pub inbound_message: Message,
    pub assistant_message: Option<Message>,
    pub tool_calls: Vec<ToolCallId>,
}

/// Result of `run_tool_loop`'s round-trip with the model. An LLM failure is
/// recovered locally rather than propagated — the caller still finalizes the
/// Turn, just with an error-flavored Message instead of a model answer.
enum LoopOutcome {
    Completed {
        text: String,
        tool_calls: Vec<ToolCallId>,
        citations: Vec<ToolCitation>,
    },
    LlmFailed {
        tool_calls: Vec<ToolCallId>,
        error_kind: String,
        message: String,
    },
}

/// Parameters accepted by `create_dialogue`.
pub struct NewDialogue {
    pub dialogue_type: DialogueType,
    pub human_id: Option<String>,
    pub ai_id: Option<String>,
    pub relation_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
}

/// The pipeline engine: routes by Dialogue type, drives the Turn lifecycle,
/// coordinates the tool loop, persists records, and fans out notifications.
///
/// Two concurrent `process_input` calls against the same Dialogue are
/// serialized by a per-Dialogue lock — state transitions of the open
/// Turn/Session always happen under that lock, while LLM/tool I/O is free
/// to run without holding it.
pub struct DialogueCore {
    store: Arc<Store>,
    config: Arc<ConversaConfig>,
    llm: Arc<dyn LlmClient>,
    invoker: Arc<ToolInvoker>,
    notify: Arc<NotificationHub>,
    turns: TurnManager,
    sessions: SessionManager,
    mixer: ResponseMixer,
    locks: DashMap<DialogueId, Arc<AsyncMutex<()>>>,
}

impl DialogueCore {
    pub fn new(
        store: Arc<Store>,
        config: Arc<ConversaConfig>,
        llm: Arc<dyn LlmClient>,
        invoker: Arc<ToolInvoker>,
        notify: Arc<NotificationHub>,
    ) -> Self {
        let turns = TurnManager::new(store.clone(), config.clone());
        let sessions = SessionManager::new(store.clone(), config.clone());
        let mixer = ResponseMixer::new(config.context.max_context_length);
        Self {
            store,
            config,
            llm,
            invoker,
            notify,
            turns,
            sessions,
            mixer,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, dialogue_id: &DialogueId) -> Arc<AsyncMutex<()>> {
        self.locks
            .entry(dialogue_id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    #[instrument(skip(self, params))]
    pub fn create_dialogue(&self, params: NewDialogue) -> Result<Dialogue> {
        validate_participants(params.dialogue_type, &params.human_id, &params.ai_id)?;
        let now = Utc::now().to_rfc3339();
        let dialogue = Dialogue {
            id: DialogueId::new(),
            dialogue_type: params.dialogue_type,
            human_id: params.human_id,
            ai_id: params.ai_id,
            relation_id: params.relation_id,
            title: params.title,
            description: params.description,
            created_at: now.clone(),
            last_activity_at: now,
            is_active: true,
            metadata: params.metadata,
        };
        self.store.insert_dialogue(&dialogue).map_err(ConversaError::from)?;
        Ok(dialogue)
    }

    #[instrument(skip(self))]
    pub async fn close_dialogue(&self, id: &DialogueId) -> Result<()> {
        let guard = self.lock_for(id);
        let _permit = guard.lock().await;

        if let Some(session) = self
            .store
            .get_open_session(id)
            .map_err(ConversaError::from)?
        {
            if let Some(turn) = self
                .turns
                .pending_for_session(&session.id)
                .map_err(ConversaError::from)?
            {
                self.turns.attach_response(&turn, &Utc::now().to_rfc3339())?;
            }
            self.store
                .close_session(&session.id, &Utc::now().to_rfc3339())
                .map_err(ConversaError::from)?;
        }
        self.store.close_dialogue(id).map_err(ConversaError::from)?;
        self.notify.publish(
            id.as_str(),
            OutboundFrame::dialogue_update(json!({"dialogue_id": id.to_string(), "is_active": false})),
        );
        Ok(())
    }

    #[instrument(skip(self, envelope), fields(dialogue_id = %envelope.dialogue_id))]
    pub async fn process_input(&self, envelope: InputEnvelope) -> Result<AssistantResult> {
        let dialogue_id = DialogueId::from(envelope.dialogue_id.clone());
        let guard = self.lock_for(&dialogue_id);
        let _permit = guard.lock().await;

        let dialogue = self.get_dialogue(&dialogue_id)?;
        if !dialogue.is_active {
            return Err(ConversaError::DialogueClosed {
                id: dialogue_id.to_string(),
            });
        }

        let semantic = InputParser::new(&self.store).parse(&envelope)?;
        let session = self.sessions.ensure_active_session(&dialogue)?;

        let turn = match &envelope.turn_id {
            Some(turn_id) => {
                let turn = self.turns.get(&TurnId::from(turn_id.clone()))?;
                if !turn.is_pending() {
                    return Err(ConversaError::TurnClosed {
                        id: turn.id.to_string(),
                    });
                }
                turn
            }
            None => {
                let responder_role = responder_role_for(dialogue.dialogue_type, envelope.sender_role);
                self.turns
                    .open_turn(&dialogue, session.id.clone(), envelope.sender_role, responder_role)?
            }
        };

        let mut metadata = envelope.metadata.clone();
        if let Some(obj) = metadata.as_object_mut() {
            obj.insert("tags".to_string(), json!(semantic.tags));
            if let Some(emotion) = &semantic.emotion {
                obj.insert("emotion".to_string(), json!(emotion));
            }
        }

        let content_type = envelope.parsed_content_type().unwrap_or(ContentType::Text);
        let inbound = Message {
            id: MessageId::new(),
            dialogue_id: dialogue_id.clone(),
            session_id: session.id.clone(),
            turn_id: turn.id.clone(),
            sender_role: envelope.sender_role,
            sender_id: envelope.sender_id.clone(),
            content: semantic.text.clone(),
            content_type,
            created_at: Utc::now().to_rfc3339(),
            metadata,
        };
        self.store.insert_message(&inbound).map_err(ConversaError::from)?;
        self.store
            .touch_dialogue_activity(&dialogue_id, &inbound.created_at)
            .map_err(ConversaError::from)?;
        self.notify
            .publish(&envelope.sender_id, OutboundFrame::message(&inbound));

        // Semantic blocks generated purely for context bookkeeping (e.g. a
        // `prompt` injection) never require a model response.
        if semantic.non_user_visible {
            return Ok(AssistantResult {
                dialogue_id,
                inbound_message: inbound,
                assistant_message: None,
                tool_calls: Vec::new(),
            });
        }

        let deadline = Duration::from_secs(self.config.turn.pipeline_timeout_secs.max(1));
        let (content, tool_calls, metadata) = match tokio::time::timeout(
            deadline,
            self.run_tool_loop(&dialogue, &session.id, &turn.id, &envelope.sender_id),
        )
        .await
        {
            Ok(Ok(LoopOutcome::Completed { text, tool_calls, citations })) => {
                let final_text = self.mixer.compose(&text, &citations, None);
                (final_text, tool_calls, json!({}))
            }
            Ok(Ok(LoopOutcome::LlmFailed {
                tool_calls,
                error_kind,
                message,
            })) => (message, tool_calls, json!({ "error_kind": error_kind })),
            Ok(Err(err)) => return Err(err),
            Err(_elapsed) => {
                self.record_event_log(
                    &dialogue_id,
                    Some(&turn.id),
                    "pipeline_timeout",
                    json!({ "timeout_secs": self.config.turn.pipeline_timeout_secs }),
                );
                (
                    String::new(),
                    Vec::new(),
                    json!({ "partial": true, "error_kind": "PIPELINE_TIMEOUT" }),
                )
            }
        };

        let assistant_message = Message {
            id: MessageId::new(),
            dialogue_id: dialogue_id.clone(),
            session_id: session.id.clone(),
            turn_id: turn.id.clone(),
            sender_role: turn.responder_role,
            sender_id: responder_id_for(&dialogue, turn.responder_role),
            content,
            content_type: ContentType::Text,
            created_at: Utc::now().to_rfc3339(),
            metadata,
        };
        self.store
            .insert_message(&assistant_message)
            .map_err(ConversaError::from)?;
        self.turns.attach_response(&turn, &assistant_message.created_at)?;
        self.store
            .touch_dialogue_activity(&dialogue_id, &assistant_message.created_at)
            .map_err(ConversaError::from)?;

        self.notify
            .publish(&envelope.sender_id, OutboundFrame::message(&assistant_message));
        self.notify.publish(
            &envelope.sender_id,
            OutboundFrame::dialogue_update(json!({
                "dialogue_id": dialogue_id.to_string(),
                "turn_id": turn.id.to_string(),
                "status": "responded",
            })),
        );

        Ok(AssistantResult {
            dialogue_id,
            inbound_message: inbound,
            assistant_message: Some(assistant_message),
            tool_calls,
        })
    }

    /// Best-effort write to `event_log`. A failure to record a failure must
    /// not itself break the local-recovery path, so the store error is
    /// logged and swallowed rather than propagated.
    fn record_event_log(&self, dialogue_id: &DialogueId, turn_id: Option<&TurnId>, kind: &str, detail: serde_json::Value) {
        let entry = EventLogEntry {
            id: EventLogId::new(),
            dialogue_id: dialogue_id.clone(),
            turn_id: turn_id.cloned(),
            kind: kind.to_string(),
            detail,
            created_at: Utc::now().to_rfc3339(),
        };
        if let Err(err) = self.store.insert_event_log(&entry) {
            warn!(%err, kind, "failed to write event_log entry");
        }
    }

    fn get_dialogue(&self, id: &DialogueId) -> Result<Dialogue> {
        self.store.get_dialogue(id).map_err(|e| match e {
            conversa_store::error::StoreError::NotFound { .. } => ConversaError::DialogueNotFound {
                id: id.to_string(),
            },
            other => ConversaError::from(other),
        })
    }

    /// Round-trips with the model, invoking tools as requested, bounded by
    /// `config.turn.max_tool_loop_depth`. Each round persists a
    /// `tool_output` Message rather than keeping an in-memory raw message
    /// vector, so the Turn's transcript stays the single source of truth
    /// for context assembly.
    async fn run_tool_loop(
        &self,
        dialogue: &Dialogue,
        session_id: &SessionId,
        turn_id: &TurnId,
        sender_id: &str,
    ) -> Result<LoopOutcome> {
        let builder = ContextBuilder::new(&self.store, self.config.context.max_context_length);
        let mut tool_call_ids = Vec::new();
        let mut citations = Vec::new();

        for _ in 0..self.config.turn.max_tool_loop_depth {
            let prompt = builder.build(session_id, &[])?;
            let completion = match self.llm.complete(&prompt, &CompletionOptions::default()).await {
                Ok(completion) => completion,
                Err(llm_err) => {
                    let conv_err = ConversaError::from(llm_err);
                    self.record_event_log(
                        &dialogue.id,
                        Some(turn_id),
                        "llm_failure",
                        json!({ "error_kind": conv_err.code(), "message": conv_err.to_string() }),
                    );
                    return Ok(LoopOutcome::LlmFailed {
                        tool_calls: tool_call_ids,
                        error_kind: conv_err.code().to_string(),
                        message: conv_err.to_string(),
                    });
                }
            };

            let Some(request) = completion.tool_request else {
                return Ok(LoopOutcome::Completed {
                    text: completion.text,
                    tool_calls: tool_call_ids,
                    citations,
                });
            };

            let invocation = self
                .invoker
                .invoke(dialogue.id.as_str(), &request.tool_id, request.parameters.clone())
                .await;

            let (success, result_text, error) = match &invocation {
                Ok(inv) if !inv.result.is_error => (true, inv.result.content.clone(), None),
                Ok(inv) => (false, inv.result.content.clone(), Some(inv.result.content.clone())),
                Err(err) => (false, String::new(), Some(err.to_string())),
            };

            if !success {
                self.record_event_log(
                    &dialogue.id,
                    Some(turn_id),
                    "tool_failure",
                    json!({ "tool_id": request.tool_id, "error": error.clone().unwrap_or_default() }),
                );
            }

            let call = ToolCall {
                id: ToolCallId::new(),
                dialogue_id: dialogue.id.clone(),
                turn_id: turn_id.clone(),
                tool_id: request.tool_id.clone(),
                parameters: request.parameters.clone(),
                success,
                result: if success { Some(json!(result_text)) } else { None },
                error: error.clone(),
                latency_ms: invocation.as_ref().map(|i| i.latency_ms).unwrap_or(0),
                created_at: Utc::now().to_rfc3339(),
            };
            self.store.insert_tool_call(&call).map_err(ConversaError::from)?;
            tool_call_ids.push(call.id.clone());

            let tool_output = Message {
                id: MessageId::new(),
                dialogue_id: dialogue.id.clone(),
                session_id: session_id.clone(),
                turn_id: turn_id.clone(),
                sender_role: ParticipantRole::System,
                sender_id: sender_id.to_string(),
                content: if success {
                    result_text.clone()
                } else {
                    error.clone().unwrap_or_default()
                },
                content_type: ContentType::ToolOutput,
                created_at: Utc::now().to_rfc3339(),
                metadata: json!({"tool_used": request.tool_id}),
            };
            self.store
                .insert_message(&tool_output)
                .map_err(ConversaError::from)?;

            if success {
                citations.push(ToolCitation {
                    tool_id: request.tool_id.clone(),
                    summary: result_text,
                });
            }
        }

        // Loop exhausted without a final answer: finalize whatever the last
        // round produced rather than leaving the Turn hanging.
        let prompt = builder.build(session_id, &[])?;
        match self.llm.complete(&prompt, &CompletionOptions::default()).await {
            Ok(completion) => Ok(LoopOutcome::Completed {
                text: completion.text,
                tool_calls: tool_call_ids,
                citations,
            }),
            Err(llm_err) => {
                let conv_err = ConversaError::from(llm_err);
                self.record_event_log(
                    &dialogue.id,
                    Some(turn_id),
                    "llm_failure",
                    json!({ "error_kind": conv_err.code(), "message": conv_err.to_string() }),
                );
                Ok(LoopOutcome::LlmFailed {
                    tool_calls: tool_call_ids,
                    error_kind: conv_err.code().to_string(),
                    message: conv_err.to_string(),
                })
            }
        }
    }
}

/// Counterparty rule by Dialogue type: who is expected to respond to a
/// Message from `sender_role`.
fn responder_role_for(dialogue_type: DialogueType, sender_role: ParticipantRole) -> ParticipantRole {
    match dialogue_type {
        DialogueType::HumanAi => ParticipantRole::Ai,
        DialogueType::AiSelf => ParticipantRole::Ai,
        DialogueType::AiAi => ParticipantRole::Ai,
        // Group topologies have no implicit single responder; the system
        // role stands in until a concrete participant is assigned on demand.
        DialogueType::HumanHumanPrivate
        | DialogueType::HumanHumanGroup
        | DialogueType::HumanAiGroup
        | DialogueType::AiMultiHuman => {
            if sender_role == ParticipantRole::System {
                ParticipantRole::Ai
            } else {
                ParticipantRole::System
            }
        }
    }
}

fn responder_id_for(dialogue: &Dialogue, role: ParticipantRole) -> String {
    match role {
        ParticipantRole::Ai => dialogue.ai_id.clone().unwrap_or_else(|| "ai".to_string()),
        ParticipantRole::Human => dialogue.human_id.clone().unwrap_or_else(|| "human".to_string()),
        ParticipantRole::System => "system".to_string(),
    }
}

fn validate_participants(
    dialogue_type: DialogueType,
    human_id: &Option<String>,
    ai_id: &Option<String>,
) -> Result<()> {
    match dialogue_type {
        DialogueType::HumanAi | DialogueType::HumanAiGroup => {
            if human_id.is_none() || ai_id.is_none() {
                return Err(ConversaError::InvalidParameters(
                    "human_ai dialogues require both human_id and ai_id".to_string(),
                ));
            }
        }
        DialogueType::AiSelf | DialogueType::AiAi | DialogueType::AiMultiHuman => {
            if ai_id.is_none() {
                return Err(ConversaError::InvalidParameters(
                    "ai-rooted dialogues require an ai_id".to_string(),
                ));
            }
        }
        DialogueType::HumanHumanPrivate | DialogueType::HumanHumanGroup => {
            if human_id.is_none() {
                return Err(ConversaError::InvalidParameters(
                    "human_human dialogues require a human_id".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conversa_llm::{LlmError, MockLlmClient};
    use conversa_tools::ToolRegistry;

    /// Always fails the completion call, for exercising the LLM-failure
    /// local-recovery path without touching `MockLlmClient`.
    struct FailingLlmClient;

    #[async_trait]
    impl LlmClient for FailingLlmClient {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(
            &self,
            _prompt: &[conversa_llm::PromptSegment],
            _options: &CompletionOptions,
        ) -> std::result::Result<conversa_llm::CompletionResult, LlmError> {
            Err(LlmError::Failed("provider unreachable".to_string()))
        }
    }

    /// Sleeps longer than any `pipeline_timeout_secs` used in tests, for
    /// exercising the pipeline-deadline recovery path.
    struct SlowLlmClient;

    #[async_trait]
    impl LlmClient for SlowLlmClient {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(
            &self,
            _prompt: &[conversa_llm::PromptSegment],
            _options: &CompletionOptions,
        ) -> std::result::Result<conversa_llm::CompletionResult, LlmError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(conversa_llm::CompletionResult {
                text: "too late".to_string(),
                tool_request: None,
                tokens_in: 0,
                tokens_out: 0,
            })
        }
    }

    fn core() -> DialogueCore {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let config = Arc::new(ConversaConfig::default());
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new());
        let invoker = Arc::new(ToolInvoker::new(ToolRegistry::with_builtins()));
        let notify = Arc::new(NotificationHub::new());
        DialogueCore::new(store, config, llm, invoker, notify)
    }

    fn core_with_llm(llm: Arc<dyn LlmClient>, config: ConversaConfig) -> (DialogueCore, Arc<Store>) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let invoker = Arc::new(ToolInvoker::new(ToolRegistry::with_builtins()));
        let notify = Arc::new(NotificationHub::new());
        let dialogues = DialogueCore::new(store.clone(), Arc::new(config), llm, invoker, notify);
        (dialogues, store)
    }

    fn envelope(dialogue_id: &DialogueId, text: &str) -> InputEnvelope {
        InputEnvelope {
            dialogue_id: dialogue_id.to_string(),
            session_id: None,
            turn_id: None,
            sender_role: ParticipantRole::Human,
            sender_id: "h1".to_string(),
            content_type: "text".to_string(),
            content: json!(text),
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn a_plain_exchange_produces_an_assistant_message_and_closes_the_turn() {
        let core = core();
        let dialogue = core
            .create_dialogue(NewDialogue {
                dialogue_type: DialogueType::HumanAi,
                human_id: Some("h1".to_string()),
                ai_id: Some("a1".to_string()),
                relation_id: None,
                title: None,
                description: None,
                metadata: json!({}),
            })
            .unwrap();

        let result = core
            .process_input(envelope(&dialogue.id, "Hi there"))
            .await
            .unwrap();

        let assistant = result.assistant_message.expect("expected an assistant reply");
        assert_eq!(assistant.content, "Acknowledged: Hi there");
        assert!(result.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn a_weather_question_drives_the_tool_loop_before_finalizing() {
        let core = core();
        let dialogue = core
            .create_dialogue(NewDialogue {
                dialogue_type: DialogueType::HumanAi,
                human_id: Some("h1".to_string()),
                ai_id: Some("a1".to_string()),
                relation_id: None,
                title: None,
                description: None,
                metadata: json!({}),
            })
            .unwrap();

        let result = core
            .process_input(envelope(&dialogue.id, "Do I need an umbrella in Singapore tomorrow?"))
            .await
            .unwrap();

        assert_eq!(result.tool_calls.len(), 1);
        let assistant = result.assistant_message.expect("expected an assistant reply");
        assert!(assistant.content.contains("Based on the forecast"));
    }

    #[tokio::test]
    async fn input_on_a_closed_dialogue_is_rejected() {
        let core = core();
        let dialogue = core
            .create_dialogue(NewDialogue {
                dialogue_type: DialogueType::HumanAi,
                human_id: Some("h1".to_string()),
                ai_id: Some("a1".to_string()),
                relation_id: None,
                title: None,
                description: None,
                metadata: json!({}),
            })
            .unwrap();
        core.close_dialogue(&dialogue.id).await.unwrap();

        let err = core
            .process_input(envelope(&dialogue.id, "hello?"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DIALOGUE_CLOSED");
    }

    #[tokio::test]
    async fn creating_a_human_ai_dialogue_without_an_ai_id_is_rejected() {
        let core = core();
        let err = core
            .create_dialogue(NewDialogue {
                dialogue_type: DialogueType::HumanAi,
                human_id: Some("h1".to_string()),
                ai_id: None,
                relation_id: None,
                title: None,
                description: None,
                metadata: json!({}),
            })
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETERS");
    }

    #[tokio::test]
    async fn an_llm_failure_is_recovered_locally_as_a_responded_turn() {
        let (core, store) = core_with_llm(Arc::new(FailingLlmClient), ConversaConfig::default());
        let dialogue = core
            .create_dialogue(NewDialogue {
                dialogue_type: DialogueType::HumanAi,
                human_id: Some("h1".to_string()),
                ai_id: Some("a1".to_string()),
                relation_id: None,
                title: None,
                description: None,
                metadata: json!({}),
            })
            .unwrap();

        let result = core
            .process_input(envelope(&dialogue.id, "hello"))
            .await
            .unwrap();

        let assistant = result.assistant_message.expect("expected a local-recovery reply");
        assert_eq!(assistant.metadata["error_kind"], json!("LLM_FAILURE"));

        let turn = core.turns.get(&assistant.turn_id).unwrap();
        assert_eq!(turn.status, conversa_core::types::TurnStatus::Responded);

        let events = store.list_event_log(&dialogue.id).unwrap();
        assert!(events.iter().any(|e| e.kind == "llm_failure"));
    }

    #[tokio::test]
    async fn a_pipeline_timeout_marks_the_reply_partial() {
        let mut config = ConversaConfig::default();
        config.turn.pipeline_timeout_secs = 1;
        let (core, store) = core_with_llm(Arc::new(SlowLlmClient), config);
        let dialogue = core
            .create_dialogue(NewDialogue {
                dialogue_type: DialogueType::HumanAi,
                human_id: Some("h1".to_string()),
                ai_id: Some("a1".to_string()),
                relation_id: None,
                title: None,
                description: None,
                metadata: json!({}),
            })
            .unwrap();

        let result = core
            .process_input(envelope(&dialogue.id, "hello"))
            .await
            .unwrap();

        let assistant = result.assistant_message.expect("expected a partial reply");
        assert!(assistant.is_partial());
        assert_eq!(assistant.metadata["error_kind"], json!("PIPELINE_TIMEOUT"));

        let events = store.list_event_log(&dialogue.id).unwrap();
        assert!(events.iter().any(|e| e.kind == "pipeline_timeout"));
    }
}
