use std::sync::Mutex;

use rusqlite::Connection;

use crate::db::init_db;
use crate::error::Result;

/// Typed persistence facade over an embedded SQLite database.
///
/// Wraps a single connection in a `Mutex` — sufficient for the single-node
/// target this core is built for; a connection pool would be the next step
/// for higher write concurrency.
pub struct Store {
    pub(crate) db: Mutex<Connection>,
}

impl Store {
    /// Open a store backed by a file at `path`, creating it and its schema
    /// if it does not yet exist.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    /// Open an in-process, non-persistent store. Selected when configuration
    /// sets `database.url` to the literal `"memory"`.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    /// Open from configuration, dispatching on the `"memory"` sentinel.
    pub fn from_database_url(url: &str) -> Result<Self> {
        if url == "memory" {
            Self::open_in_memory()
        } else {
            Self::open(url)
        }
    }
}

fn next_seq(conn: &Connection, turn_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(seq), -1) + 1 FROM message WHERE turn_id = ?1",
        rusqlite::params![turn_id],
        |row| row.get(0),
    )
}

pub(crate) use next_seq as next_message_seq;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_initializes_schema_idempotently() {
        let store = Store::open_in_memory().unwrap();
        // calling init_db again through a second open must not fail
        let conn = store.db.lock().unwrap();
        init_db(&conn).unwrap();
    }
}
