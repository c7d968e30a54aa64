use conversa_core::entities::{IntrospectionSession, IntrospectionStep};
use conversa_core::types::{DialogueId, IntrospectionSessionId, SessionId};
use rusqlite::{params, Row};
use tracing::instrument;

use crate::error::{Result, StoreError};
use crate::store::Store;

const COLUMNS: &str = "id, dialogue_id, session_id, goal, steps, summary, created_at, completed_at";

impl Store {
    #[instrument(skip(self, session))]
    pub fn insert_introspection_session(&self, session: &IntrospectionSession) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            &format!("INSERT INTO introspection_session ({COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)"),
            params![
                session.id.as_str(),
                session.dialogue_id.as_str(),
                session.session_id.as_str(),
                session.goal,
                serde_json::to_string(&session.steps)?,
                session.summary,
                session.created_at,
                session.completed_at,
            ],
        )?;
        Ok(())
    }

    /// Replace the step list and optionally close out the session with a
    /// summary and completion timestamp.
    #[instrument(skip(self, steps))]
    pub fn update_introspection_steps(
        &self,
        id: &IntrospectionSessionId,
        steps: &[IntrospectionStep],
        summary: Option<&str>,
        completed_at: Option<&str>,
    ) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE introspection_session SET steps = ?1, summary = ?2, completed_at = ?3 \
             WHERE id = ?4",
            params![
                serde_json::to_string(steps)?,
                summary,
                completed_at,
                id.as_str(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get_introspection_session(
        &self,
        id: &IntrospectionSessionId,
    ) -> Result<IntrospectionSession> {
        let db = self.db.lock().unwrap();
        db.query_row(
            &format!("SELECT {COLUMNS} FROM introspection_session WHERE id = ?1"),
            params![id.as_str()],
            row_to_introspection,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                what: "introspection_session",
                id: id.to_string(),
            },
            other => StoreError::Database(other),
        })
    }
}

fn row_to_introspection(row: &Row<'_>) -> rusqlite::Result<IntrospectionSession> {
    let steps_str: String = row.get(4)?;
    Ok(IntrospectionSession {
        id: IntrospectionSessionId::from(row.get::<_, String>(0)?),
        dialogue_id: DialogueId::from(row.get::<_, String>(1)?),
        session_id: SessionId::from(row.get::<_, String>(2)?),
        goal: row.get(3)?,
        steps: serde_json::from_str(&steps_str).unwrap_or_default(),
        summary: row.get(5)?,
        created_at: row.get(6)?,
        completed_at: row.get(7)?,
    })
}
