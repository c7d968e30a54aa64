use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use conversa_core::entities::{Dialogue, Session};
use conversa_core::error::Result;
use conversa_core::types::{CreatedBy, SessionId, SessionType};
use conversa_core::ConversaConfig;
use conversa_store::Store;
use tracing::{info, instrument};

/// Owns the idle-threshold rollover between Sessions within a Dialogue.
pub struct SessionManager {
    store: Arc<Store>,
    config: Arc<ConversaConfig>,
}

impl SessionManager {
    pub fn new(store: Arc<Store>, config: Arc<ConversaConfig>) -> Self {
        Self { store, config }
    }

    fn idle_threshold(&self, dialogue: &Dialogue) -> Duration {
        let hours = dialogue
            .session_idle_hours_override()
            .unwrap_or(self.config.session.idle_timeout_hours);
        Duration::hours(hours)
    }

    /// Returns the Dialogue's currently open Session, rolling over to a new
    /// one if the last closed Turn in the open Session is older than the
    /// idle threshold. Creates the first Session if none exists yet.
    #[instrument(skip(self, dialogue))]
    pub fn ensure_active_session(&self, dialogue: &Dialogue) -> Result<Session> {
        let existing = self
            .store
            .get_open_session(&dialogue.id)
            .map_err(conversa_core::ConversaError::from)?;

        if let Some(session) = existing {
            if !self.is_idle(dialogue, &session)? {
                return Ok(session);
            }
            let now = Utc::now().to_rfc3339();
            self.store
                .close_session(&session.id, &now)
                .map_err(conversa_core::ConversaError::from)?;
            info!(session_id = %session.id, "rolled over idle session");
        }

        self.open_session(dialogue)
    }

    fn is_idle(&self, dialogue: &Dialogue, session: &Session) -> Result<bool> {
        let last_closed = self
            .store
            .last_turn_closed_at(&session.id)
            .map_err(conversa_core::ConversaError::from)?;
        let Some(last_closed) = last_closed else {
            return Ok(false);
        };
        let last_closed: DateTime<Utc> = last_closed
            .parse()
            .map_err(|e| conversa_core::ConversaError::Internal(format!("bad timestamp: {e}")))?;
        Ok(Utc::now() - last_closed > self.idle_threshold(dialogue))
    }

    fn open_session(&self, dialogue: &Dialogue) -> Result<Session> {
        let session = Session {
            id: SessionId::new(),
            dialogue_id: dialogue.id.clone(),
            session_type: SessionType::Dialogue,
            start_at: Utc::now().to_rfc3339(),
            end_at: None,
            description: None,
            created_by: CreatedBy::System,
        };
        self.store
            .insert_session(&session)
            .map_err(conversa_core::ConversaError::from)?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::types::{DialogueId, DialogueType};
    use serde_json::json;

    fn dialogue() -> Dialogue {
        Dialogue {
            id: DialogueId::new(),
            dialogue_type: DialogueType::HumanAi,
            human_id: Some("h1".to_string()),
            ai_id: Some("a1".to_string()),
            relation_id: None,
            title: None,
            description: None,
            created_at: Utc::now().to_rfc3339(),
            last_activity_at: Utc::now().to_rfc3339(),
            is_active: true,
            metadata: json!({}),
        }
    }

    #[test]
    fn creates_a_session_when_none_exists() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let config = Arc::new(ConversaConfig::default());
        let manager = SessionManager::new(store.clone(), config);
        let d = dialogue();
        let session = manager.ensure_active_session(&d).unwrap();
        assert!(session.is_open());
    }

    #[test]
    fn reuses_the_open_session_when_not_idle() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let config = Arc::new(ConversaConfig::default());
        let manager = SessionManager::new(store.clone(), config);
        let d = dialogue();
        let first = manager.ensure_active_session(&d).unwrap();
        let second = manager.ensure_active_session(&d).unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn rolls_over_once_the_idle_threshold_has_elapsed() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let config = Arc::new(ConversaConfig::default());
        let manager = SessionManager::new(store.clone(), config);
        let mut d = dialogue();
        d.metadata = json!({"session_idle_hours": 1});

        let first = manager.ensure_active_session(&d).unwrap();

        use conversa_core::types::{ParticipantRole, TurnId, TurnStatus};
        let long_ago = (Utc::now() - Duration::hours(3)).to_rfc3339();
        let turn = conversa_core::entities::Turn {
            id: TurnId::new(),
            dialogue_id: d.id.clone(),
            session_id: first.id.clone(),
            initiator_role: ParticipantRole::Human,
            responder_role: ParticipantRole::Ai,
            started_at: long_ago.clone(),
            closed_at: Some(long_ago),
            status: TurnStatus::Responded,
            deadline_at: Utc::now().to_rfc3339(),
        };
        store.insert_turn(&turn).unwrap();

        let second = manager.ensure_active_session(&d).unwrap();
        assert_ne!(first.id, second.id);
        assert!(store.get_session(&first.id).unwrap().end_at.is_some());
    }
}
