use rusqlite::Connection;

use crate::error::Result;

/// Initialise every table this core owns plus the indexes the query
/// endpoints rely on. Safe to call on every startup — uses `IF NOT EXISTS`
/// throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS dialogue (
            id               TEXT PRIMARY KEY,
            dialogue_type    TEXT NOT NULL,
            human_id         TEXT,
            ai_id            TEXT,
            relation_id      TEXT,
            title            TEXT,
            description      TEXT,
            created_at       TEXT NOT NULL,
            last_activity_at TEXT NOT NULL,
            is_active        INTEGER NOT NULL DEFAULT 1,
            metadata         TEXT NOT NULL DEFAULT '{}'
        );
        CREATE INDEX IF NOT EXISTS idx_dialogue_type ON dialogue(dialogue_type);
        CREATE INDEX IF NOT EXISTS idx_dialogue_active ON dialogue(is_active);

        CREATE TABLE IF NOT EXISTS session (
            id          TEXT PRIMARY KEY,
            dialogue_id TEXT NOT NULL,
            session_type TEXT NOT NULL,
            start_at    TEXT NOT NULL,
            end_at      TEXT,
            description TEXT,
            created_by  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_session_dialogue ON session(dialogue_id);
        CREATE INDEX IF NOT EXISTS idx_session_open ON session(dialogue_id, end_at);

        CREATE TABLE IF NOT EXISTS turn (
            id              TEXT PRIMARY KEY,
            dialogue_id     TEXT NOT NULL,
            session_id      TEXT NOT NULL,
            initiator_role  TEXT NOT NULL,
            responder_role  TEXT NOT NULL,
            started_at      TEXT NOT NULL,
            closed_at       TEXT,
            status          TEXT NOT NULL,
            deadline_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_turn_dialogue ON turn(dialogue_id);
        CREATE INDEX IF NOT EXISTS idx_turn_session ON turn(session_id);
        CREATE INDEX IF NOT EXISTS idx_turn_status ON turn(status);
        CREATE INDEX IF NOT EXISTS idx_turn_deadline ON turn(status, deadline_at);

        CREATE TABLE IF NOT EXISTS message (
            id           TEXT PRIMARY KEY,
            dialogue_id  TEXT NOT NULL,
            session_id   TEXT NOT NULL,
            turn_id      TEXT NOT NULL,
            sender_role  TEXT NOT NULL,
            sender_id    TEXT NOT NULL,
            content      TEXT NOT NULL,
            content_type TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            seq          INTEGER NOT NULL,
            metadata     TEXT NOT NULL DEFAULT '{}'
        );
        CREATE INDEX IF NOT EXISTS idx_message_dialogue ON message(dialogue_id);
        CREATE INDEX IF NOT EXISTS idx_message_session ON message(session_id, created_at, seq);
        CREATE INDEX IF NOT EXISTS idx_message_turn ON message(turn_id, created_at, seq);

        CREATE TABLE IF NOT EXISTS tool_call (
            id          TEXT PRIMARY KEY,
            dialogue_id TEXT NOT NULL,
            turn_id     TEXT NOT NULL,
            tool_id     TEXT NOT NULL,
            parameters  TEXT NOT NULL,
            success     INTEGER NOT NULL,
            result      TEXT,
            error       TEXT,
            latency_ms  INTEGER NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tool_call_turn ON tool_call(turn_id);

        CREATE TABLE IF NOT EXISTS event_log (
            id          TEXT PRIMARY KEY,
            dialogue_id TEXT NOT NULL,
            turn_id     TEXT,
            kind        TEXT NOT NULL,
            detail      TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_event_log_dialogue ON event_log(dialogue_id, created_at);

        CREATE TABLE IF NOT EXISTS introspection_session (
            id           TEXT PRIMARY KEY,
            dialogue_id  TEXT NOT NULL,
            session_id   TEXT NOT NULL,
            goal         TEXT NOT NULL,
            steps        TEXT NOT NULL DEFAULT '[]',
            summary      TEXT,
            created_at   TEXT NOT NULL,
            completed_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_introspection_dialogue ON introspection_session(dialogue_id);

        CREATE TABLE IF NOT EXISTS collaboration_session (
            id           TEXT PRIMARY KEY,
            dialogue_id  TEXT NOT NULL,
            task         TEXT NOT NULL,
            participants TEXT NOT NULL DEFAULT '[]',
            created_at   TEXT NOT NULL,
            completed_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_collaboration_dialogue ON collaboration_session(dialogue_id);",
    )?;
    Ok(())
}
