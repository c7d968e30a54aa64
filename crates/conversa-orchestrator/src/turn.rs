use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use conversa_core::entities::{Dialogue, Turn};
use conversa_core::error::Result;
use conversa_core::types::{ParticipantRole, SessionId, TurnId, TurnStatus};
use conversa_core::ConversaConfig;
use conversa_store::Store;
use tracing::{info, instrument};

/// Owns Turn state transitions and the response-window deadline.
///
/// ```text
/// pending ──(matching response within window)──▶ responded
/// pending ──(deadline passes)──────────────────▶ unresponded
/// ```
/// Both target states are terminal.
pub struct TurnManager {
    store: Arc<Store>,
    config: Arc<ConversaConfig>,
}

impl TurnManager {
    pub fn new(store: Arc<Store>, config: Arc<ConversaConfig>) -> Self {
        Self { store, config }
    }

    /// Response window for a Dialogue: its metadata override, falling back
    /// to configuration.
    pub fn response_window(&self, dialogue: &Dialogue) -> Duration {
        let hours = dialogue
            .response_window_hours_override()
            .unwrap_or(self.config.turn.response_window_hours);
        Duration::hours(hours)
    }

    #[instrument(skip(self, dialogue))]
    pub fn open_turn(
        &self,
        dialogue: &Dialogue,
        session_id: SessionId,
        initiator_role: ParticipantRole,
        responder_role: ParticipantRole,
    ) -> Result<Turn> {
        let now = Utc::now();
        let deadline = now + self.response_window(dialogue);
        let turn = Turn {
            id: TurnId::new(),
            dialogue_id: dialogue.id.clone(),
            session_id,
            initiator_role,
            responder_role,
            started_at: now.to_rfc3339(),
            closed_at: None,
            status: TurnStatus::Pending,
            deadline_at: deadline.to_rfc3339(),
        };
        self.store.insert_turn(&turn).map_err(conversa_core::ConversaError::from)?;
        Ok(turn)
    }

    /// Transition a pending Turn to `responded` if `message_created_at` is
    /// at or before the deadline. Returns `false` if the Turn was already
    /// closed (e.g. by a concurrent sweep) — the caller should not persist
    /// a response for a Turn that's no longer open.
    #[instrument(skip(self))]
    pub fn attach_response(&self, turn: &Turn, message_created_at: &str) -> Result<bool> {
        let deadline: DateTime<Utc> = turn
            .deadline_at
            .parse()
            .map_err(|e| conversa_core::ConversaError::Internal(format!("bad deadline: {e}")))?;
        let responded_at: DateTime<Utc> = message_created_at
            .parse()
            .map_err(|e| conversa_core::ConversaError::Internal(format!("bad timestamp: {e}")))?;
        if responded_at > deadline {
            return Ok(false);
        }
        self.store
            .mark_turn_responded(&turn.id, message_created_at)
            .map_err(conversa_core::ConversaError::from)
    }

    /// Transition every expired pending Turn to `unresponded`. Safe to call
    /// concurrently and redundantly — each Turn transitions at most once.
    #[instrument(skip(self))]
    pub fn sweep(&self) -> Result<Vec<TurnId>> {
        let now = Utc::now().to_rfc3339();
        let swept = self
            .store
            .sweep_expired_turns(&now)
            .map_err(conversa_core::ConversaError::from)?;
        if !swept.is_empty() {
            info!(count = swept.len(), "swept expired turns to unresponded");
        }
        Ok(swept)
    }

    pub fn get(&self, id: &TurnId) -> Result<Turn> {
        self.store.get_turn(id).map_err(conversa_core::ConversaError::from)
    }

    pub fn pending_for_session(&self, session_id: &SessionId) -> Result<Option<Turn>> {
        self.store
            .get_pending_turn(session_id)
            .map_err(conversa_core::ConversaError::from)
    }
}
