//! The SQLite connection pool behind every request.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Path that selects a throwaway in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Connection tunables, normally taken from the `[database]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// Milliseconds a connection waits on a locked database before giving up
    /// with `SQLITE_BUSY`.
    pub busy_timeout_ms: u64,

    /// Upper bound on pooled connections. Ignored for [`IN_MEMORY`].
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens a pool over the Q&A database at `db_path`.
///
/// Each connection runs in WAL mode with foreign keys on and the configured
/// busy timeout. Every SQLite connection to [`IN_MEMORY`] is a separate
/// database, so that path gets a single connection that is never recycled;
/// the schema migrated through it is the one every request sees.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if a connection cannot be opened or
/// configured.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let busy_timeout_ms = settings.busy_timeout_ms;
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| configure_connection(conn, busy_timeout_ms));

    let in_memory = db_path == IN_MEMORY;
    let builder = if in_memory {
        if settings.pool_max_size > 1 {
            tracing::warn!(
                requested = settings.pool_max_size,
                "in-memory database uses a single pooled connection"
            );
        }
        Pool::builder()
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
    } else {
        Pool::builder().max_size(settings.pool_max_size)
    };
    let pool = builder.build(manager)?;

    tracing::debug!(
        path = db_path,
        connections = pool.max_size(),
        busy_timeout_ms,
        "database pool ready"
    );
    Ok(pool)
}

fn configure_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    let mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    // In-memory databases keep journal_mode = memory.
    if !matches!(mode.as_str(), "wal" | "memory") {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal_mode stayed {mode}, expected wal")),
        ));
    }
    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {busy_timeout_ms};"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_migrations;

    fn pragma(conn: &Connection, name: &str) -> String {
        conn.query_row(&format!("PRAGMA {name};"), [], |row| {
            row.get::<_, rusqlite::types::Value>(0)
        })
        .map(|value| match value {
            rusqlite::types::Value::Integer(n) => n.to_string(),
            rusqlite::types::Value::Text(s) => s,
            other => format!("{other:?}"),
        })
        .unwrap()
    }

    #[test]
    fn connections_get_foreign_keys_and_busy_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa_app.db");
        let settings = DbRuntimeSettings {
            busy_timeout_ms: 2_500,
            pool_max_size: 3,
        };
        let pool = create_pool(path.to_str().unwrap(), settings).unwrap();
        assert_eq!(pool.max_size(), 3);

        let conn = pool.get().unwrap();
        assert_eq!(pragma(&conn, "journal_mode"), "wal");
        assert_eq!(pragma(&conn, "foreign_keys"), "1");
        assert_eq!(pragma(&conn, "busy_timeout"), "2500");
        assert!(path.exists());
    }

    #[test]
    fn in_memory_pool_shares_one_migrated_database() {
        let pool = create_pool(IN_MEMORY, DbRuntimeSettings::default()).unwrap();
        assert_eq!(pool.max_size(), 1);

        run_migrations(&pool.get().unwrap()).unwrap();
        pool.get()
            .unwrap()
            .execute(
                "INSERT INTO users (ldap_id, name, created_at) VALUES ('12345678', 'Tanaka', 'now')",
                [],
            )
            .unwrap();

        for _ in 0..8 {
            let conn = pool.get().unwrap();
            let users: i64 = conn
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .unwrap();
            assert_eq!(users, 1);
            assert_eq!(pragma(&conn, "foreign_keys"), "1");
        }
    }
}
