//! Articles store: documents as opaque JSON field bags.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::MutexGuard;

use crate::StoreError;

/// An article document's fields. The store never interprets them beyond
/// the pending-queue query.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Articles store with a borrowed connection.
pub struct Articles<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Articles<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Get a document's field bag by id.
    pub fn get(&self, id: &str) -> Result<Option<FieldMap>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT fields FROM articles WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => {
                let value: serde_json::Value = serde_json::from_str(&json)?;
                match value {
                    serde_json::Value::Object(map) => Ok(Some(map)),
                    _ => Ok(Some(FieldMap::new())),
                }
            }
            None => Ok(None),
        }
    }

    /// Merge the given fields into the stored bag, creating the document
    /// if needed. The whole document is replaced in one statement, so the
    /// write is last-writer-wins at document granularity.
    pub fn upsert(&self, id: &str, fields: &FieldMap) -> Result<(), StoreError> {
        let mut bag = self.get(id)?.unwrap_or_default();
        for (key, value) in fields {
            bag.insert(key.clone(), value.clone());
        }
        let json = serde_json::Value::Object(bag).to_string();

        self.conn.execute(
            r#"
            INSERT INTO articles (id, fields) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET fields = excluded.fields
            "#,
            params![id, json],
        )?;

        Ok(())
    }

    /// The next article awaiting analysis: has a title and body but no
    /// global score yet.
    pub fn next_pending(&self) -> Result<Option<(String, FieldMap)>, StoreError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                r#"
                SELECT id, fields FROM articles
                WHERE json_extract(fields, '$.titulo') IS NOT NULL
                  AND json_extract(fields, '$.cuerpo') IS NOT NULL
                  AND json_extract(fields, '$.puntuacion') IS NULL
                ORDER BY rowid
                LIMIT 1
                "#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((id, json)) => {
                let value: serde_json::Value = serde_json::from_str(&json)?;
                let fields = match value {
                    serde_json::Value::Object(map) => map,
                    _ => FieldMap::new(),
                };
                Ok(Some((id, fields)))
            }
            None => Ok(None),
        }
    }

    /// Delete a document. Returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let affected = self
            .conn
            .execute("DELETE FROM articles WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}
