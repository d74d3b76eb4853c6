use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};

use crate::config::app_cache_dir;

pub const ACCESS_KEY: &str = "access";
pub const REFRESH_KEY: &str = "refresh";
pub const USERNAME_KEY: &str = "username";
pub const GROUPS_KEY: &str = "groups";
pub const LOGIN_TIME_KEY: &str = "loginTime";

/// Every key `logout` clears.
pub const SESSION_KEYS: [&str; 5] = [ACCESS_KEY, REFRESH_KEY, USERNAME_KEY, GROUPS_KEY, LOGIN_TIME_KEY];

/// Persistent key/value storage for session state. Reads and writes are not
/// coordinated across processes.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteTokenStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open session db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory session db")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("session.sqlite"))
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS session (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .context("create session schema")?;
    Ok(())
}

impl TokenStore for SqliteTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock().ok()?;
        conn.query_row(
            "SELECT value FROM session WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .unwrap_or_else(|err| {
            log::warn!("session read {key} failed: {err}");
            None
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("session db lock poisoned"))?;
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO session (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )
        .with_context(|| format!("write session key {key}"))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("session db lock poisoned"))?;
        conn.execute("DELETE FROM session WHERE key = ?1", params![key])
            .with_context(|| format!("delete session key {key}"))?;
        Ok(())
    }
}

/// Volatile store for tests and for running without a cache directory.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(entries: &[(&str, &str)]) -> Self {
        let store = Self::new();
        if let Ok(mut values) = store.values.lock() {
            for (k, v) in entries {
                values.insert(k.to_string(), v.to_string());
            }
        }
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| anyhow!("token store lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| anyhow!("token store lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_store_round_trips_and_overwrites() {
        let store = SqliteTokenStore::open_in_memory().expect("open");
        assert!(store.get(ACCESS_KEY).is_none());
        store.set(ACCESS_KEY, "a1").expect("set");
        store.set(ACCESS_KEY, "a2").expect("set");
        assert_eq!(store.get(ACCESS_KEY).as_deref(), Some("a2"));
        store.remove(ACCESS_KEY).expect("remove");
        assert!(store.get(ACCESS_KEY).is_none());
    }
}
