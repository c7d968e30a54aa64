use conversa_core::entities::CollaborationSession;
use conversa_core::types::{CollaborationSessionId, DialogueId};
use rusqlite::{params, Row};
use tracing::instrument;

use crate::error::{Result, StoreError};
use crate::store::Store;

const COLUMNS: &str = "id, dialogue_id, task, participants, created_at, completed_at";

impl Store {
    #[instrument(skip(self, session))]
    pub fn insert_collaboration_session(&self, session: &CollaborationSession) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            &format!("INSERT INTO collaboration_session ({COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6)"),
            params![
                session.id.as_str(),
                session.dialogue_id.as_str(),
                session.task,
                serde_json::to_string(&session.participants)?,
                session.created_at,
                session.completed_at,
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn complete_collaboration_session(
        &self,
        id: &CollaborationSessionId,
        completed_at: &str,
    ) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE collaboration_session SET completed_at = ?1 WHERE id = ?2",
            params![completed_at, id.as_str()],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get_collaboration_session(
        &self,
        id: &CollaborationSessionId,
    ) -> Result<CollaborationSession> {
        let db = self.db.lock().unwrap();
        db.query_row(
            &format!("SELECT {COLUMNS} FROM collaboration_session WHERE id = ?1"),
            params![id.as_str()],
            row_to_collaboration,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                what: "collaboration_session",
                id: id.to_string(),
            },
            other => StoreError::Database(other),
        })
    }
}

fn row_to_collaboration(row: &Row<'_>) -> rusqlite::Result<CollaborationSession> {
    let participants_str: String = row.get(3)?;
    Ok(CollaborationSession {
        id: CollaborationSessionId::from(row.get::<_, String>(0)?),
        dialogue_id: DialogueId::from(row.get::<_, String>(1)?),
        task: row.get(2)?,
        participants: serde_json::from_str(&participants_str).unwrap_or_default(),
        created_at: row.get(4)?,
        completed_at: row.get(5)?,
    })
}
