use super::KvStore;
use crate::error::DrawResult;
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed key-value store. Several widgets may share one database
/// file; each sees only its own namespace.
pub struct SqliteStore {
    conn:      Connection,
    namespace: String,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str, namespace: &str) -> DrawResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only applies to real files; in-memory databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn, namespace: namespace.to_string() })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory(namespace: &str) -> DrawResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, namespace: namespace.to_string() })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DrawResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_kv_store.sql"))?;
        Ok(())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Keys present in this namespace, sorted.
    pub fn keys(&self) -> DrawResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT key FROM kv_entry WHERE namespace = ?1 ORDER BY key ASC",
        )?;
        let keys = stmt
            .query_map(params![self.namespace], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

impl KvStore for SqliteStore {
    fn load(&self, key: &str) -> DrawResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entry WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn persist(&mut self, key: &str, value: &str) -> DrawResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entry (namespace, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value",
            params![self.namespace, key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> DrawResult<()> {
        self.conn.execute(
            "DELETE FROM kv_entry WHERE namespace = ?1 AND key = ?2",
            params![self.namespace, key],
        )?;
        Ok(())
    }
}
