use conversa_core::entities::Message;
use conversa_core::types::{ContentType, DialogueId, MessageId, ParticipantRole, SessionId, TurnId};
use rusqlite::{params, Row};
use tracing::instrument;

use crate::error::{Result, StoreError};
use crate::query::{MessageFilter, Page, Pagination};
use crate::store::{next_message_seq, Store};

const COLUMNS: &str = "id, dialogue_id, session_id, turn_id, sender_role, sender_id, \
                       content, content_type, created_at, seq, metadata";

impl Store {
    /// Insert a Message, assigning its ordering sequence number within the
    /// owning Turn. The server owns both `created_at` and `seq` — client
    /// clocks are never trusted for ordering.
    #[instrument(skip(self, message))]
    pub fn insert_message(&self, message: &Message) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let seq = next_message_seq(&db, message.turn_id.as_str())?;
        db.execute(
            &format!("INSERT INTO message ({COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)"),
            params![
                message.id.as_str(),
                message.dialogue_id.as_str(),
                message.session_id.as_str(),
                message.turn_id.as_str(),
                message.sender_role.to_string(),
                message.sender_id,
                message.content,
                message.content_type.to_string(),
                message.created_at,
                seq,
                serde_json::to_string(&message.metadata)?,
            ],
        )?;
        Ok(seq)
    }

    #[instrument(skip(self))]
    pub fn get_message(&self, id: &MessageId) -> Result<Message> {
        let db = self.db.lock().unwrap();
        db.query_row(
            &format!("SELECT {COLUMNS} FROM message WHERE id = ?1"),
            params![id.as_str()],
            row_to_message,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                what: "message",
                id: id.to_string(),
            },
            other => StoreError::Database(other),
        })
    }

    /// All Messages of a Turn, ordered by `created_at` with `seq` as the
    /// monotonic tiebreak — never reordered once written.
    #[instrument(skip(self))]
    pub fn list_messages_for_turn(&self, turn_id: &TurnId) -> Result<Vec<Message>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {COLUMNS} FROM message WHERE turn_id = ?1 ORDER BY created_at ASC, seq ASC"
        ))?;
        let rows = stmt.query_map(params![turn_id.as_str()], row_to_message)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// The most recent Messages of a Session, oldest first, capped at
    /// `limit` rows. Used by context assembly before budget truncation.
    #[instrument(skip(self))]
    pub fn recent_messages_for_session(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {COLUMNS} FROM message WHERE session_id = ?1 \
             ORDER BY created_at DESC, seq DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![session_id.as_str(), limit as i64], row_to_message)?;
        let mut items: Vec<Message> = rows.filter_map(|r| r.ok()).collect();
        items.reverse();
        Ok(items)
    }

    pub fn list_messages(
        &self,
        filter: &MessageFilter,
        pagination: &Pagination,
    ) -> Result<Page<Message>> {
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
        if let Some(t) = &filter.turn_id {
            clauses.push("turn_id = ?".to_string());
            args.push(Box::new(t.clone()));
        }
        if let Some(r) = &filter.sender_role {
            clauses.push("sender_role = ?".to_string());
            args.push(Box::new(r.clone()));
        }
        if let Some(ct) = &filter.content_type {
            clauses.push("content_type = ?".to_string());
            args.push(Box::new(ct.clone()));
        }
        if let Some(since) = &filter.since {
            clauses.push("created_at >= ?".to_string());
            args.push(Box::new(since.clone()));
        }
        if let Some(until) = &filter.until {
            clauses.push("created_at <= ?".to_string());
            args.push(Box::new(until.clone()));
        }
        if let Some(q) = &filter.query {
            clauses.push("content LIKE ?".to_string());
            args.push(Box::new(format!("%{q}%")));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = db.query_row(
            &format!("SELECT COUNT(*) FROM message {where_clause}"),
            rusqlite::params_from_iter(args.iter().map(|b| b.as_ref())),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {COLUMNS} FROM message {where_clause} \
             ORDER BY created_at DESC, seq DESC LIMIT ?{} OFFSET ?{}",
            args.len() + 1,
            args.len() + 2
        );
        let mut stmt = db.prepare(&sql)?;
        let limit = pagination.page_size() as i64;
        let offset = pagination.offset() as i64;
        let mut all_args: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        all_args.push(&limit);
        all_args.push(&offset);
        let rows = stmt.query_map(rusqlite::params_from_iter(all_args), row_to_message)?;
        let items: Vec<Message> = rows.filter_map(|r| r.ok()).collect();

        Ok(Page::new(items, total.max(0) as u64, pagination))
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let sender_role: String = row.get(4)?;
    let content_type: String = row.get(7)?;
    let metadata_str: String = row.get(10)?;
    Ok(Message {
        id: MessageId::from(row.get::<_, String>(0)?),
        dialogue_id: DialogueId::from(row.get::<_, String>(1)?),
        session_id: SessionId::from(row.get::<_, String>(2)?),
        turn_id: TurnId::from(row.get::<_, String>(3)?),
        sender_role: parse_role(&sender_role),
        sender_id: row.get(5)?,
        content: row.get(6)?,
        content_type: content_type.parse().unwrap_or(ContentType::Unknown),
        created_at: row.get(8)?,
        metadata: serde_json::from_str(&metadata_str).unwrap_or(serde_json::Value::Null),
    })
}

fn parse_role(s: &str) -> ParticipantRole {
    match s {
        "human" => ParticipantRole::Human,
        "ai" => ParticipantRole::Ai,
        _ => ParticipantRole::System,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(turn_id: TurnId, dialogue_id: DialogueId, session_id: SessionId) -> Message {
        Message {
            id: MessageId::new(),
            dialogue_id,
            session_id,
            turn_id,
            sender_role: ParticipantRole::Human,
            sender_id: "h1".to_string(),
            content: "hello".to_string(),
            content_type: ContentType::Text,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            metadata: json!({}),
        }
    }

    #[test]
    fn messages_within_a_turn_get_increasing_sequence_numbers() {
        let store = Store::open_in_memory().unwrap();
        let turn_id = TurnId::new();
        let m1 = sample(turn_id.clone(), DialogueId::new(), SessionId::new());
        let m2 = sample(turn_id.clone(), m1.dialogue_id.clone(), m1.session_id.clone());

        let seq1 = store.insert_message(&m1).unwrap();
        let seq2 = store.insert_message(&m2).unwrap();
        assert_eq!(seq1, 0);
        assert_eq!(seq2, 1);

        let listed = store.list_messages_for_turn(&turn_id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, m1.id);
        assert_eq!(listed[1].id, m2.id);
    }

    #[test]
    fn query_filters_by_content_type() {
        let store = Store::open_in_memory().unwrap();
        let turn_id = TurnId::new();
        let mut m = sample(turn_id, DialogueId::new(), SessionId::new());
        m.content_type = ContentType::ToolOutput;
        store.insert_message(&m).unwrap();

        let filter = MessageFilter {
            content_type: Some("tool_output".to_string()),
            ..Default::default()
        };
        let page = store.list_messages(&filter, &Pagination::default()).unwrap();
        assert_eq!(page.total, 1);
    }
}
