//! Flat key-value persistence.
//!
//! ## Backends
//! - [`MemoryStore`]: process-local map, used in tests and for throwaway runs
//! - [`FileStore`]: one JSON file per key inside a directory
//! - [`SqliteStore`]: a single `kv` table; compare-and-swap is one conditional
//!   statement, so several client processes can share the same database file
//!
//! Every backend offers [`KvStore::compare_and_swap`] so that callers can build
//! an append that does not lose writes under concurrent writers.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::error::{ChatError, Result};

pub trait KvStore: Send + Sync {
    /// Current value for `key`, or `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Unconditionally overwrite `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write `new` only if the current value equals `expected`
    /// (`None` meaning "key absent"). Returns whether the write happened.
    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool>;

    fn remove(&self, key: &str) -> Result<()>;
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    m.lock()
        .map_err(|_| ChatError::Io(io::Error::new(io::ErrorKind::Other, "store lock poisoned")))
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool> {
        let mut guard = lock(&self.entries)?;
        if guard.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        guard.insert(key.to_string(), new.to_string());
        Ok(true)
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries)?.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written value. Compare-and-swap is serialized
/// within this process only.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStore {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<key>.json`, with every byte outside `[A-Za-z0-9-]` written as
    /// `_XX` hex so distinct keys never share a file.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 5);
        for b in key.bytes() {
            if b.is_ascii_alphanumeric() || b == b'-' {
                name.push(b as char);
            } else {
                name.push_str(&format!("_{b:02X}"));
            }
        }
        name.push_str(".json");
        self.dir.join(name)
    }

    /// Invalid UTF-8 is decoded lossily so a damaged file reads as a corrupt
    /// value instead of an error, and can still be replaced.
    fn read(&self, key: &str) -> Result<Option<String>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(s) => Ok(Some(s)),
                Err(e) => {
                    warn!(key, "store file is not valid UTF-8");
                    Ok(Some(String::from_utf8_lossy(e.as_bytes()).into_owned()))
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(value.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = value.len(), "wrote store file");
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = lock(&self.write_lock)?;
        self.write(key, value)
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool> {
        let _guard = lock(&self.write_lock)?;
        if self.read(key)?.as_deref() != expected {
            return Ok(false);
        }
        self.write(key, new)?;
        Ok(true)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = lock(&self.write_lock)?;
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = lock(&self.conn)?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool> {
        let conn = lock(&self.conn)?;
        let changed = match expected {
            None => conn.execute(
                "INSERT OR IGNORE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, new],
            )?,
            Some(old) => conn.execute(
                "UPDATE kv SET value = ?3 WHERE key = ?1 AND value = ?2",
                params![key, old, new],
            )?,
        };
        Ok(changed == 1)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
