use conversa_core::entities::Session;
use conversa_core::types::{CreatedBy, DialogueId, SessionId, SessionType};
use rusqlite::{params, Row};
use tracing::instrument;

use crate::error::{Result, StoreError};
use crate::query::{Page, Pagination, SessionFilter};
use crate::store::Store;

const COLUMNS: &str = "id, dialogue_id, session_type, start_at, end_at, description, created_by";

impl Store {
    #[instrument(skip(self, session))]
    pub fn insert_session(&self, session: &Session) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            &format!("INSERT INTO session ({COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7)"),
            params![
                session.id.as_str(),
                session.dialogue_id.as_str(),
                session_type_str(session.session_type),
                session.start_at,
                session.end_at,
                session.description,
                created_by_str(session.created_by),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get_session(&self, id: &SessionId) -> Result<Session> {
        let db = self.db.lock().unwrap();
        db.query_row(
            &format!("SELECT {COLUMNS} FROM session WHERE id = ?1"),
            params![id.as_str()],
            row_to_session,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                what: "session",
                id: id.to_string(),
            },
            other => StoreError::Database(other),
        })
    }

    /// The currently open Session of a Dialogue, if any. At most one row
    /// should ever match — callers rely on that invariant holding.
    #[instrument(skip(self))]
    pub fn get_open_session(&self, dialogue_id: &DialogueId) -> Result<Option<Session>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!(
                "SELECT {COLUMNS} FROM session WHERE dialogue_id = ?1 AND end_at IS NULL \
                 ORDER BY start_at DESC LIMIT 1"
            ),
            params![dialogue_id.as_str()],
            row_to_session,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    #[instrument(skip(self))]
    pub fn close_session(&self, id: &SessionId, end_at: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE session SET end_at = ?1 WHERE id = ?2",
            params![end_at, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                what: "session",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// The most recently started Turn's `closed_at` within a Session, used
    /// by the idle-rollover check. Returns `None` if the Session has no
    /// closed Turn yet.
    #[instrument(skip(self))]
    pub fn last_turn_closed_at(&self, session_id: &SessionId) -> Result<Option<String>> {
        let db = self.db.lock().unwrap();
        let result: Option<String> = db
            .query_row(
                "SELECT closed_at FROM turn WHERE session_id = ?1 AND closed_at IS NOT NULL \
                 ORDER BY started_at DESC LIMIT 1",
                params![session_id.as_str()],
                |row| row.get(0),
            )
            .ok();
        Ok(result)
    }

    pub fn list_sessions(
        &self,
        filter: &SessionFilter,
        pagination: &Pagination,
    ) -> Result<Page<Session>> {
        let db = self.db.lock().unwrap();
        let mut clauses = Vec::new();
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(d) = &filter.dialogue_id {
            clauses.push("dialogue_id = ?".to_string());
            args.push(Box::new(d.clone()));
        }
        if filter.open_only.unwrap_or(false) {
            clauses.push("end_at IS NULL".to_string());
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = db.query_row(
            &format!("SELECT COUNT(*) FROM session {where_clause}"),
            rusqlite::params_from_iter(args.iter().map(|b| b.as_ref())),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {COLUMNS} FROM session {where_clause} ORDER BY start_at DESC LIMIT ?{} OFFSET ?{}",
            args.len() + 1,
            args.len() + 2
        );
        let mut stmt = db.prepare(&sql)?;
        let limit = pagination.page_size() as i64;
        let offset = pagination.offset() as i64;
        let mut all_args: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        all_args.push(&limit);
        all_args.push(&offset);
        let rows = stmt.query_map(rusqlite::params_from_iter(all_args), row_to_session)?;
        let items: Vec<Session> = rows.filter_map(|r| r.ok()).collect();

        Ok(Page::new(items, total.max(0) as u64, pagination))
    }
}

fn session_type_str(t: SessionType) -> &'static str {
    match t {
        SessionType::Dialogue => "dialogue",
        SessionType::SelfReflection => "self_reflection",
    }
}

fn parse_session_type(s: &str) -> SessionType {
    match s {
        "self_reflection" => SessionType::SelfReflection,
        _ => SessionType::Dialogue,
    }
}

fn created_by_str(c: CreatedBy) -> &'static str {
    match c {
        CreatedBy::System => "system",
        CreatedBy::Ai => "ai",
        CreatedBy::Human => "human",
    }
}

fn parse_created_by(s: &str) -> CreatedBy {
    match s {
        "ai" => CreatedBy::Ai,
        "human" => CreatedBy::Human,
        _ => CreatedBy::System,
    }
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let session_type_str: String = row.get(2)?;
    let created_by_str: String = row.get(6)?;
    Ok(Session {
        id: SessionId::from(row.get::<_, String>(0)?),
        dialogue_id: DialogueId::from(row.get::<_, String>(1)?),
        session_type: parse_session_type(&session_type_str),
        start_at: row.get(3)?,
        end_at: row.get(4)?,
        description: row.get(5)?,
        created_by: parse_created_by(&created_by_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(dialogue_id: DialogueId) -> Session {
        Session {
            id: SessionId::new(),
            dialogue_id,
            session_type: SessionType::Dialogue,
            start_at: "2026-01-01T00:00:00Z".to_string(),
            end_at: None,
            description: None,
            created_by: CreatedBy::System,
        }
    }

    #[test]
    fn at_most_one_open_session_is_returned_for_a_dialogue() {
        let store = Store::open_in_memory().unwrap();
        let dialogue_id = DialogueId::new();
        let s = sample(dialogue_id.clone());
        store.insert_session(&s).unwrap();
        let open = store.get_open_session(&dialogue_id).unwrap().unwrap();
        assert_eq!(open.id, s.id);

        store.close_session(&s.id, "2026-01-01T01:00:00Z").unwrap();
        assert!(store.get_open_session(&dialogue_id).unwrap().is_none());
    }
}
