use conversa_core::entities::Dialogue;
use conversa_core::types::DialogueId;
use rusqlite::{params, Row};
use tracing::instrument;

use crate::error::{Result, StoreError};
use crate::query::{DialogueFilter, Page, Pagination};
use crate::store::Store;

const COLUMNS: &str = "id, dialogue_type, human_id, ai_id, relation_id, title, description,
                       created_at, last_activity_at, is_active, metadata";

impl Store {
    #[instrument(skip(self, dialogue))]
    pub fn insert_dialogue(&self, dialogue: &Dialogue) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            &format!("INSERT INTO dialogue ({COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)"),
            params![
                dialogue.id.as_str(),
                dialogue.dialogue_type.to_string(),
                dialogue.human_id,
                dialogue.ai_id,
                dialogue.relation_id,
                dialogue.title,
                dialogue.description,
                dialogue.created_at,
                dialogue.last_activity_at,
                dialogue.is_active,
                serde_json::to_string(&dialogue.metadata)?,
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get_dialogue(&self, id: &DialogueId) -> Result<Dialogue> {
        let db = self.db.lock().unwrap();
        db.query_row(
            &format!("SELECT {COLUMNS} FROM dialogue WHERE id = ?1"),
            params![id.as_str()],
            row_to_dialogue,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                what: "dialogue",
                id: id.to_string(),
            },
            other => StoreError::Database(other),
        })
    }

    #[instrument(skip(self))]
    pub fn touch_dialogue_activity(&self, id: &DialogueId, at: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE dialogue SET last_activity_at = ?1 WHERE id = ?2",
            params![at, id.as_str()],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn close_dialogue(&self, id: &DialogueId) -> Result<()> {
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE dialogue SET is_active = 0 WHERE id = ?1",
            params![id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                what: "dialogue",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    pub fn list_dialogues(
        &self,
        filter: &DialogueFilter,
        pagination: &Pagination,
    ) -> Result<Page<Dialogue>> {
        let db = self.db.lock().unwrap();
        let mut clauses = Vec::new();
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(t) = &filter.dialogue_type {
            clauses.push("dialogue_type = ?".to_string());
            args.push(Box::new(t.clone()));
        }
        if let Some(h) = &filter.human_id {
            clauses.push("human_id = ?".to_string());
            args.push(Box::new(h.clone()));
        }
        if let Some(a) = &filter.ai_id {
            clauses.push("ai_id = ?".to_string());
            args.push(Box::new(a.clone()));
        }
        if let Some(active) = filter.is_active {
            clauses.push("is_active = ?".to_string());
            args.push(Box::new(active));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM dialogue {where_clause}");
        let total: i64 = db.query_row(
            &count_sql,
            rusqlite::params_from_iter(args.iter().map(|b| b.as_ref())),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {COLUMNS} FROM dialogue {where_clause} \
             ORDER BY last_activity_at DESC LIMIT ?{} OFFSET ?{}",
            args.len() + 1,
            args.len() + 2
        );
        let mut stmt = db.prepare(&sql)?;
        let limit = pagination.page_size() as i64;
        let offset = pagination.offset() as i64;
        let mut all_args: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        all_args.push(&limit);
        all_args.push(&offset);
        let rows = stmt.query_map(rusqlite::params_from_iter(all_args), row_to_dialogue)?;
        let items: Vec<Dialogue> = rows.filter_map(|r| r.ok()).collect();

        Ok(Page::new(items, total.max(0) as u64, pagination))
    }
}

fn row_to_dialogue(row: &Row<'_>) -> rusqlite::Result<Dialogue> {
    let dialogue_type_str: String = row.get(1)?;
    let metadata_str: String = row.get(10)?;
    Ok(Dialogue {
        id: DialogueId::from(row.get::<_, String>(0)?),
        dialogue_type: dialogue_type_str.parse().unwrap_or(conversa_core::types::DialogueType::HumanAi),
        human_id: row.get(2)?,
        ai_id: row.get(3)?,
        relation_id: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
        last_activity_at: row.get(8)?,
        is_active: row.get(9)?,
        metadata: serde_json::from_str(&metadata_str).unwrap_or(serde_json::Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::types::DialogueType;
    use serde_json::json;

    fn sample(id: DialogueId) -> Dialogue {
        Dialogue {
            id,
            dialogue_type: DialogueType::HumanAi,
            human_id: Some("h1".to_string()),
            ai_id: Some("a1".to_string()),
            relation_id: None,
            title: Some("Test".to_string()),
            description: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            last_activity_at: "2026-01-01T00:00:00Z".to_string(),
            is_active: true,
            metadata: json!({}),
        }
    }

    #[test]
    fn insert_then_get_roundtrips_modulo_nothing() {
        let store = Store::open_in_memory().unwrap();
        let d = sample(DialogueId::new());
        store.insert_dialogue(&d).unwrap();
        let fetched = store.get_dialogue(&d.id).unwrap();
        assert_eq!(fetched.id, d.id);
        assert_eq!(fetched.human_id, d.human_id);
    }

    #[test]
    fn get_missing_dialogue_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.get_dialogue(&DialogueId::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn close_dialogue_then_reclose_is_reported_not_found() {
        let store = Store::open_in_memory().unwrap();
        let d = sample(DialogueId::new());
        store.insert_dialogue(&d).unwrap();
        store.close_dialogue(&d.id).unwrap();
        let fetched = store.get_dialogue(&d.id).unwrap();
        assert!(!fetched.is_active);
    }

    #[test]
    fn list_dialogues_filters_by_type_and_paginates() {
        let store = Store::open_in_memory().unwrap();
        for _ in 0..3 {
            store.insert_dialogue(&sample(DialogueId::new())).unwrap();
        }
        let page = store
            .list_dialogues(&DialogueFilter::default(), &Pagination::default())
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 3);
    }
}
