//! Key-value persistence
//!
//! String records that survive restarts. Reads never fail: a missing or
//! unreadable key is reported as `None` so callers can fall back to defaults.

use crate::error::VoiceResult;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Persistent string storage shared by the voice settings and the CLI
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when missing or unreadable
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> VoiceResult<()>;

    /// Delete a value if present
    fn remove(&self, key: &str) -> VoiceResult<()>;
}

/// SQLite-backed store, one `kv` table
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn new(db_path: PathBuf) -> VoiceResult<Self> {
        let store = Self { db_path };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> VoiceResult<()> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn read(&self, key: &str) -> VoiceResult<Option<String>> {
        let conn = Connection::open(&self.db_path)?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.read(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️ Failed to read '{}' from store: {}", key, e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> VoiceResult<()> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
            (key, value),
        )?;
        debug!("Stored '{}' ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> VoiceResult<()> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
        Ok(())
    }
}

/// Volatile store, used when the on-disk store cannot be opened
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> VoiceResult<()> {
        let mut values = self.values.lock()?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> VoiceResult<()> {
        let mut values = self.values.lock()?;
        values.remove(key);
        Ok(())
    }
}
