//! Persistence for the playlist manager and anything else the engine keeps
//! across restarts.
//!
//! The real on-disk settings store is an out-of-scope collaborator (the
//! spec's Section 1 DELIBERATELY OUT OF SCOPE list), but the Playlist
//! Manager's public contract is specified *against* a key-value store, so
//! this module ships the trait plus two concrete, swappable backends: a
//! SQLite-backed one for real persistence and an in-memory one for tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::Result;

/// Opaque key/value persistence, keyed by the record names in the spec's
/// persisted-state layout (`user`, `play_mode`, `volume`, `player_snapshot`,
/// `last_sign_in`, `ext_info`).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// `rusqlite`-backed store: a single `kv` table opened with one connection
/// guarded by a mutex, following the crate's existing database conventions.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value BLOB NOT NULL)",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value BLOB NOT NULL)",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock().expect("kv connection poisoned");
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let conn = self.conn.lock().expect("kv connection poisoned");
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().expect("kv connection poisoned");
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// A `Mutex<HashMap<..>>` store used by unit tests and as a safe default when
/// no on-disk path has been configured.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().expect("kv map poisoned").get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.data
            .lock()
            .expect("kv map poisoned")
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.data.lock().expect("kv map poisoned").remove(key);
        Ok(())
    }
}

/// Record keys for the persisted-state layout (Section 6).
pub mod keys {
    pub const USER: &str = "user";
    pub const PLAY_MODE: &str = "play_mode";
    pub const VOLUME: &str = "volume";
    pub const PLAYER_SNAPSHOT: &str = "player_snapshot";
    pub const LAST_SIGN_IN: &str = "last_sign_in";
    pub const EXT_INFO: &str = "ext_info";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_round_trips() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("missing").unwrap(), None);
        store.set("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn sqlite_round_trips_and_upserts() {
        let store = SqliteKeyValueStore::open_in_memory().unwrap();
        store.set("k", b"v1").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v1".to_vec()));
        store.set("k", b"v2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn sqlite_file_backend_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auracore.db");

        {
            let store = SqliteKeyValueStore::open(&path).unwrap();
            store.set(keys::VOLUME, b"42").unwrap();
        }

        let reopened = SqliteKeyValueStore::open(&path).unwrap();
        assert_eq!(reopened.get(keys::VOLUME).unwrap(), Some(b"42".to_vec()));
    }
}
