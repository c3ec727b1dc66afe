use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};

use crate::kv::KeyValueStore;

/// SQLite-backed key-value store.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn delete_value(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Option<String> {
        match self.get_value(key) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, "reading stored value failed: {e:#}");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value)
            .with_context(|| format!("Failed to write '{key}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(db.get("missing").is_none());
        db.set("wtw-planner", "{}").unwrap();
        assert_eq!(db.get("wtw-planner").as_deref(), Some("{}"));
    }

    #[test]
    fn test_set_overwrites() {
        let mut db = Database::open_in_memory().unwrap();
        db.set("k", "one").unwrap();
        db.set("k", "two").unwrap();
        assert_eq!(db.get_value("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_delete_value() {
        let db = Database::open_in_memory().unwrap();
        db.set_value("k", "v").unwrap();
        assert!(db.delete_value("k").unwrap());
        assert!(!db.delete_value("k").unwrap());
        assert!(db.get_value("k").unwrap().is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wtw.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.set("wtw-recurring", r#"{"Monday":[]}"#).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get("wtw-recurring").as_deref(), Some(r#"{"Monday":[]}"#));
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let version: i64 = db
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
