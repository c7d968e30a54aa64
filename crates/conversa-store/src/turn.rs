use conversa_core::entities::Turn;
use conversa_core::types::{DialogueId, ParticipantRole, SessionId, TurnId, TurnStatus};
use rusqlite::{params, Row};
use tracing::instrument;

use crate::error::{Result, StoreError};
use crate::query::{Page, Pagination, TurnFilter};
use crate::store::Store;

const COLUMNS: &str = "id, dialogue_id, session_id, initiator_role, responder_role, \
                       started_at, closed_at, status, deadline_at";

impl Store {
    #[instrument(skip(self, turn))]
    pub fn insert_turn(&self, turn: &Turn) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            &format!("INSERT INTO turn ({COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)"),
            params![
                turn.id.as_str(),
                turn.dialogue_id.as_str(),
                turn.session_id.as_str(),
                role_str(turn.initiator_role),
                role_str(turn.responder_role),
                turn.started_at,
                turn.closed_at,
                status_str(turn.status),
                turn.deadline_at,
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get_turn(&self, id: &TurnId) -> Result<Turn> {
        let db = self.db.lock().unwrap();
        db.query_row(
            &format!("SELECT {COLUMNS} FROM turn WHERE id = ?1"),
            params![id.as_str()],
            row_to_turn,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                what: "turn",
                id: id.to_string(),
            },
            other => StoreError::Database(other),
        })
    }

    /// The most recent still-pending Turn of a Session, if any.
    #[instrument(skip(self))]
    pub fn get_pending_turn(&self, session_id: &SessionId) -> Result<Option<Turn>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!(
                "SELECT {COLUMNS} FROM turn WHERE session_id = ?1 AND status = 'pending' \
                 ORDER BY started_at DESC LIMIT 1"
            ),
            params![session_id.as_str()],
            row_to_turn,
        ) {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Transition a pending Turn to `responded`. Fails silently (no row
    /// changed) if the Turn was already closed by a concurrent sweep.
    #[instrument(skip(self))]
    pub fn mark_turn_responded(&self, id: &TurnId, closed_at: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE turn SET status = 'responded', closed_at = ?1 \
             WHERE id = ?2 AND status = 'pending'",
            params![closed_at, id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Sweep all Turns whose deadline has passed while still `pending` into
    /// `unresponded`, returning the ids that were transitioned.
    #[instrument(skip(self))]
    pub fn sweep_expired_turns(&self, now: &str) -> Result<Vec<TurnId>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, deadline_at FROM turn WHERE status = 'pending' AND deadline_at <= ?1",
        )?;
        let expired: Vec<(String, String)> = stmt
            .query_map(params![now], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        drop(stmt);

        let mut ids = Vec::with_capacity(expired.len());
        for (id, deadline) in expired {
            db.execute(
                "UPDATE turn SET status = 'unresponded', closed_at = ?1 \
                 WHERE id = ?2 AND status = 'pending'",
                params![deadline, id],
            )?;
            ids.push(TurnId::from(id));
        }
        Ok(ids)
    }

    pub fn list_turns(&self, filter: &TurnFilter, pagination: &Pagination) -> Result<Page<Turn>> {
        let db = self.db.lock().unwrap();
        let mut clauses = Vec::new();
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(d) = &filter.dialogue_id {
            clauses.push("dialogue_id = ?".to_string());
            args.push(Box::new(d.clone()));
        }
        if let Some(s) = &filter.session_id {
            clauses.push("session_id = ?".to_string());
            args.push(Box::new(s.clone()));
        }
        if let Some(st) = &filter.status {
            clauses.push("status = ?".to_string());
            args.push(Box::new(st.clone()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = db.query_row(
            &format!("SELECT COUNT(*) FROM turn {where_clause}"),
            rusqlite::params_from_iter(args.iter().map(|b| b.as_ref())),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {COLUMNS} FROM turn {where_clause} ORDER BY started_at DESC LIMIT ?{} OFFSET ?{}",
            args.len() + 1,
            args.len() + 2
        );
        let mut stmt = db.prepare(&sql)?;
        let limit = pagination.page_size() as i64;
        let offset = pagination.offset() as i64;
        let mut all_args: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        all_args.push(&limit);
        all_args.push(&offset);
        let rows = stmt.query_map(rusqlite::params_from_iter(all_args), row_to_turn)?;
        let items: Vec<Turn> = rows.filter_map(|r| r.ok()).collect();

        Ok(Page::new(items, total.max(0) as u64, pagination))
    }
}

fn role_str(r: ParticipantRole) -> &'static str {
    match r {
        ParticipantRole::Human => "human",
        ParticipantRole::Ai => "ai",
        ParticipantRole::System => "system",
    }
}

fn parse_role(s: &str) -> ParticipantRole {
    match s {
        "human" => ParticipantRole::Human,
        "ai" => ParticipantRole::Ai,
        _ => ParticipantRole::System,
    }
}

fn status_str(s: TurnStatus) -> &'static str {
    match s {
        TurnStatus::Pending => "pending",
        TurnStatus::Responded => "responded",
        TurnStatus::Unresponded => "unresponded",
    }
}

fn parse_status(s: &str) -> TurnStatus {
    match s {
        "responded" => TurnStatus::Responded,
        "unresponded" => TurnStatus::Unresponded,
        _ => TurnStatus::Pending,
    }
}

fn row_to_turn(row: &Row<'_>) -> rusqlite::Result<Turn> {
    let initiator: String = row.get(3)?;
    let responder: String = row.get(4)?;
    let status: String = row.get(7)?;
    Ok(Turn {
        id: TurnId::from(row.get::<_, String>(0)?),
        dialogue_id: DialogueId::from(row.get::<_, String>(1)?),
        session_id: SessionId::from(row.get::<_, String>(2)?),
        initiator_role: parse_role(&initiator),
        responder_role: parse_role(&responder),
        started_at: row.get(5)?,
        closed_at: row.get(6)?,
        status: parse_status(&status),
        deadline_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(dialogue_id: DialogueId, session_id: SessionId, deadline_at: &str) -> Turn {
        Turn {
            id: TurnId::new(),
            dialogue_id,
            session_id,
            initiator_role: ParticipantRole::Human,
            responder_role: ParticipantRole::Ai,
            started_at: "2026-01-01T00:00:00Z".to_string(),
            closed_at: None,
            status: TurnStatus::Pending,
            deadline_at: deadline_at.to_string(),
        }
    }

    #[test]
    fn mark_responded_transitions_pending_turn_once() {
        let store = Store::open_in_memory().unwrap();
        let t = sample(DialogueId::new(), SessionId::new(), "2026-01-01T03:00:00Z");
        store.insert_turn(&t).unwrap();

        let changed = store
            .mark_turn_responded(&t.id, "2026-01-01T00:05:00Z")
            .unwrap();
        assert!(changed);

        let again = store
            .mark_turn_responded(&t.id, "2026-01-01T00:06:00Z")
            .unwrap();
        assert!(!again);

        let fetched = store.get_turn(&t.id).unwrap();
        assert!(matches!(fetched.status, TurnStatus::Responded));
    }

    #[test]
    fn sweep_transitions_only_turns_past_their_deadline() {
        let store = Store::open_in_memory().unwrap();
        let expired = sample(DialogueId::new(), SessionId::new(), "2026-01-01T00:00:00Z");
        let not_yet = sample(DialogueId::new(), SessionId::new(), "2026-01-02T00:00:00Z");
        store.insert_turn(&expired).unwrap();
        store.insert_turn(&not_yet).unwrap();

        let swept = store.sweep_expired_turns("2026-01-01T12:00:00Z").unwrap();
        assert_eq!(swept, vec![expired.id.clone()]);

        assert!(matches!(
            store.get_turn(&expired.id).unwrap().status,
            TurnStatus::Unresponded
        ));
        assert!(matches!(
            store.get_turn(&not_yet.id).unwrap().status,
            TurnStatus::Pending
        ));
    }
}
