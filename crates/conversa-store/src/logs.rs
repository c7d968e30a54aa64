use conversa_core::entities::{EventLogEntry, ToolCall};
use conversa_core::types::{DialogueId, EventLogId, ToolCallId, TurnId};
use rusqlite::{params, Row};
use tracing::instrument;

use crate::error::Result;
use crate::store::Store;

const TOOL_CALL_COLUMNS: &str =
    "id, dialogue_id, turn_id, tool_id, parameters, success, result, error, latency_ms, created_at";
const EVENT_LOG_COLUMNS: &str = "id, dialogue_id, turn_id, kind, detail, created_at";

impl Store {
    #[instrument(skip(self, call))]
    pub fn insert_tool_call(&self, call: &ToolCall) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            &format!(
                "INSERT INTO tool_call ({TOOL_CALL_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)"
            ),
            params![
                call.id.as_str(),
                call.dialogue_id.as_str(),
                call.turn_id.as_str(),
                call.tool_id,
                serde_json::to_string(&call.parameters)?,
                call.success,
                call.result.as_ref().map(serde_json::to_string).transpose()?,
                call.error,
                call.latency_ms,
                call.created_at,
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn list_tool_calls_for_turn(&self, turn_id: &TurnId) -> Result<Vec<ToolCall>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {TOOL_CALL_COLUMNS} FROM tool_call WHERE turn_id = ?1 ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map(params![turn_id.as_str()], row_to_tool_call)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    #[instrument(skip(self, entry))]
    pub fn insert_event_log(&self, entry: &EventLogEntry) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            &format!("INSERT INTO event_log ({EVENT_LOG_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6)"),
            params![
                entry.id.as_str(),
                entry.dialogue_id.as_str(),
                entry.turn_id.as_ref().map(|t| t.as_str()),
                entry.kind,
                serde_json::to_string(&entry.detail)?,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn list_event_log(&self, dialogue_id: &DialogueId) -> Result<Vec<EventLogEntry>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "SELECT {EVENT_LOG_COLUMNS} FROM event_log WHERE dialogue_id = ?1 ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map(params![dialogue_id.as_str()], row_to_event_log)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

fn row_to_tool_call(row: &Row<'_>) -> rusqlite::Result<ToolCall> {
    let parameters_str: String = row.get(4)?;
    let result_str: Option<String> = row.get(6)?;
    Ok(ToolCall {
        id: ToolCallId::from(row.get::<_, String>(0)?),
        dialogue_id: DialogueId::from(row.get::<_, String>(1)?),
        turn_id: TurnId::from(row.get::<_, String>(2)?),
        tool_id: row.get(3)?,
        parameters: serde_json::from_str(&parameters_str).unwrap_or(serde_json::Value::Null),
        success: row.get(5)?,
        result: result_str.and_then(|s| serde_json::from_str(&s).ok()),
        error: row.get(7)?,
        latency_ms: row.get::<_, i64>(8)? as u64,
        created_at: row.get(9)?,
    })
}

fn row_to_event_log(row: &Row<'_>) -> rusqlite::Result<EventLogEntry> {
    let detail_str: String = row.get(4)?;
    let turn_id: Option<String> = row.get(2)?;
    Ok(EventLogEntry {
        id: EventLogId::from(row.get::<_, String>(0)?),
        dialogue_id: DialogueId::from(row.get::<_, String>(1)?),
        turn_id: turn_id.map(TurnId::from),
        kind: row.get(3)?,
        detail: serde_json::from_str(&detail_str).unwrap_or(serde_json::Value::Null),
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_call_roundtrips_with_failure_reason() {
        let store = Store::open_in_memory().unwrap();
        let turn_id = TurnId::new();
        let call = ToolCall {
            id: ToolCallId::new(),
            dialogue_id: DialogueId::new(),
            turn_id: turn_id.clone(),
            tool_id: "weather".to_string(),
            parameters: json!({"city": "Singapore"}),
            success: false,
            result: None,
            error: Some("timeout".to_string()),
            latency_ms: 5000,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        store.insert_tool_call(&call).unwrap();
        let listed = store.list_tool_calls_for_turn(&turn_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].success);
        assert_eq!(listed[0].error.as_deref(), Some("timeout"));
    }
}
