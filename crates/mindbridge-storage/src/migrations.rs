//! Database schema migrations.
//!
//! Applies the session binding schema and records applied versions in
//! `schema_migrations`.

use rusqlite::Connection;
use tracing::info;

use mindbridge_core::error::MindbridgeError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), MindbridgeError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| MindbridgeError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| {
            MindbridgeError::Storage(format!("Failed to query migration version: {}", e))
        })?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: bot_sessions");
    }

    Ok(())
}

/// Version 1: user → dialogue-engine session bindings.
fn apply_v1(conn: &Connection) -> Result<(), MindbridgeError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS bot_sessions (
            user_id     TEXT PRIMARY KEY NOT NULL,
            session_id  TEXT NOT NULL,
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            updated_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'bot_sessions');
        ",
    )
    .map_err(|e| MindbridgeError::Storage(format!("Migration v1 failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_user_id_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO bot_sessions (user_id, session_id) VALUES ('u1', 's1')",
            [],
        )
        .unwrap();
        let duplicate = conn.execute(
            "INSERT INTO bot_sessions (user_id, session_id) VALUES ('u1', 's2')",
            [],
        );
        assert!(duplicate.is_err());
    }
}
