//! SQLite handle for the session store.
//!
//! One connection behind a mutex; file databases run in WAL mode so readers
//! are never blocked by the occasional session write.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use mindbridge_core::error::MindbridgeError;

use crate::migrations;

const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 5000;";

fn storage_error(context: &str, e: rusqlite::Error) -> MindbridgeError {
    MindbridgeError::Storage(format!("{}: {}", context, e))
}

/// Migrated SQLite connection shared by the session store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file at `path`, creating parent
    /// directories as needed.
    pub fn new(path: &Path) -> Result<Self, MindbridgeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn =
            Connection::open(path).map_err(|e| storage_error("Failed to open database", e))?;
        conn.execute_batch(FILE_PRAGMAS)
            .map_err(|e| storage_error("Failed to set pragmas", e))?;

        let db = Self::migrated(conn)?;
        info!(path = %path.display(), "Session database ready");
        Ok(db)
    }

    /// Private in-memory database, used by tests.
    pub fn in_memory() -> Result<Self, MindbridgeError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| storage_error("Failed to open in-memory database", e))?;
        Self::migrated(conn)
    }

    fn migrated(conn: Connection) -> Result<Self, MindbridgeError> {
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` while holding the connection lock.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, MindbridgeError>
    where
        F: FnOnce(&Connection) -> Result<T, MindbridgeError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| MindbridgeError::Storage("Database lock poisoned".to_string()))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
