//! SQLite-backed key-value substrate.
//!
//! [`SqliteKv`] owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation. All documents live in a
//! single `kv` table.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};

use crate::backend::KvBackend;
use crate::error::{Result, StoreError};
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/karriery/karriery.db`
    /// - macOS:   `~/Library/Application Support/com.karriery.karriery/karriery.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\karriery\karriery\data\karriery.db`
    pub fn open_default() -> Result<Self> {
        Self::open_at(&default_db_path()?)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %path.display(), "opening database");

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Open a private in-memory database (used by tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

/// Platform data directory location of `karriery.db`. Creates the directory.
pub fn default_db_path() -> Result<PathBuf> {
    let project_dirs =
        ProjectDirs::from("com", "karriery", "karriery").ok_or(StoreError::NoDataDir)?;
    let data_dir = project_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.join("karriery.db"))
}

impl KvBackend for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let now = chrono::Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )?;
            for (key, value) in entries {
                stmt.execute(params![key, value, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let kv = SqliteKv::open_at(&path).expect("should open");
        assert!(kv.path().is_some());

        kv.set("users", "{\"users\":[]}").unwrap();
        drop(kv);

        let reopened = SqliteKv::open_at(&path).unwrap();
        assert_eq!(
            reopened.get("users").unwrap().as_deref(),
            Some("{\"users\":[]}")
        );
    }

    #[test]
    fn open_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.db");
        SqliteKv::open_at(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn upsert_and_remove() {
        let kv = SqliteKv::open_in_memory().unwrap();
        assert_eq!(kv.get("k").unwrap(), None);

        kv.set("k", "a").unwrap();
        kv.set("k", "b").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("b"));

        kv.remove("k").unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
    }

    #[test]
    fn set_many_writes_all() {
        let kv = SqliteKv::open_in_memory().unwrap();
        kv.set("a", "old").unwrap();
        kv.set_many(&[("a", "new".to_string()), ("b", "2".to_string())])
            .unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("new"));
        assert_eq!(kv.get("b").unwrap().as_deref(), Some("2"));
    }
}
