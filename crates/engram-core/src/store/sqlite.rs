//! SQLite key-value store
//!
//! Durable [`KeyValueStore`] backing for skills, critiques, and provenance.
//! Separate reader/writer connections behind mutexes so all methods take
//! `&self` and the store is `Send + Sync` behind an `Arc`.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::KeyValueStore;
use crate::error::{MemoryError, Result};

pub struct SqliteKeyValueStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    /// Open (or create) the store at `dir/engram.db`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| MemoryError::Internal(format!("create data dir: {e}")))?;
        let path = dir.join("engram.db");

        let writer = Connection::open(&path).map_err(db_err)?;
        Self::configure_connection(&writer)?;
        writer
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                     namespace TEXT NOT NULL,
                     key TEXT NOT NULL,
                     value BLOB NOT NULL,
                     PRIMARY KEY (namespace, key)
                 );",
            )
            .map_err(db_err)?;

        let reader = Connection::open(&path).map_err(db_err)?;
        Self::configure_connection(&reader)?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(db_err)
    }
}

fn db_err(e: rusqlite::Error) -> MemoryError {
    MemoryError::Transient(format!("sqlite: {e}"))
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<()> {
        let writer = self.writer.lock();
        writer
            .execute(
                "INSERT INTO kv (namespace, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value",
                params![namespace, key, value],
            )
            .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let reader = self.reader.lock();
        reader
            .query_row(
                "SELECT value FROM kv WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<bool> {
        let writer = self.writer.lock();
        let changed = writer
            .execute(
                "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    async fn scan(&self, namespace: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let reader = self.reader.lock();
        let mut stmt = reader
            .prepare("SELECT key, value FROM kv WHERE namespace = ?1 ORDER BY rowid")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![namespace], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }
}
