//! Embedded schema migrations.
//!
//! Each migration is a SQL file compiled into the binary. Applied migrations
//! are recorded in `_chie_migrations`, so running the full list against an
//! initialised database is a no-op.

use rusqlite::Connection;
use thiserror::Error;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. New migrations are appended here.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "000_init",
        sql: include_str!("migrations/000_init.sql"),
    },
    Migration {
        name: "001_users",
        sql: include_str!("migrations/001_users.sql"),
    },
    Migration {
        name: "002_questions",
        sql: include_str!("migrations/002_questions.sql"),
    },
    Migration {
        name: "003_answers",
        sql: include_str!("migrations/003_answers.sql"),
    },
];

/// Errors that can occur while applying migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A statement within a migration failed; the migration was rolled back.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        name: String,
        source: rusqlite::Error,
    },

    /// Failed to read which migrations have been applied.
    #[error("failed to check migration state: {0}")]
    StateQuery(rusqlite::Error),
}

impl MigrationError {
    fn execution(name: &str) -> impl FnOnce(rusqlite::Error) -> Self + '_ {
        move |source| Self::ExecutionFailed {
            name: name.to_string(),
            source,
        }
    }
}

/// Applies every pending migration and returns how many were applied.
///
/// # Errors
///
/// Returns `MigrationError` if a migration fails (its changes are rolled
/// back) or the tracking table cannot be queried.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    run_migrations_from_list(conn, MIGRATIONS)
}

fn run_migrations_from_list(
    conn: &Connection,
    migrations: &[Migration],
) -> Result<usize, MigrationError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _chie_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(MigrationError::execution("_chie_migrations_bootstrap"))?;

    let mut applied = 0;

    for migration in migrations {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _chie_migrations WHERE name = ?1",
                [migration.name],
                |row| row.get(0),
            )
            .map_err(MigrationError::StateQuery)?;

        if already_applied {
            tracing::debug!(migration = migration.name, "migration already applied");
            continue;
        }

        tracing::info!(migration = migration.name, "applying migration");

        let tx = conn
            .unchecked_transaction()
            .map_err(MigrationError::execution(migration.name))?;
        tx.execute_batch(migration.sql)
            .map_err(MigrationError::execution(migration.name))?;
        tx.execute(
            "INSERT INTO _chie_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(MigrationError::execution(migration.name))?;
        tx.commit()
            .map_err(MigrationError::execution(migration.name))?;

        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, table: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )
        .expect("should query sqlite_master")
    }

    #[test]
    fn fresh_db_gets_all_tables() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, MIGRATIONS.len());

        for table in ["_chie_migrations", "users", "questions", "answers"] {
            assert!(table_exists(&conn, table), "{table} should exist");
        }

        let recorded: i64 = conn
            .query_row("SELECT COUNT(*) FROM _chie_migrations", [], |row| row.get(0))
            .expect("should count migrations");
        assert_eq!(recorded, MIGRATIONS.len() as i64);
    }

    #[test]
    fn rerun_is_noop() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        assert_eq!(run_migrations(&conn).unwrap(), 4);
        assert_eq!(run_migrations(&conn).unwrap(), 0, "nothing left to apply");
    }

    #[test]
    fn users_table_rejects_malformed_ids() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (ldap_id, name, created_at) VALUES ('12345678', 'Ok', 'now')",
            [],
        )
        .expect("valid id inserts");

        for bad in ["1234567", "1234567a", "123456789"] {
            let res = conn.execute(
                "INSERT INTO users (ldap_id, name, created_at) VALUES (?1, 'Bad', 'now')",
                [bad],
            );
            assert!(res.is_err(), "{bad} should violate the check constraint");
        }
    }

    #[test]
    fn deleting_best_answer_clears_pointer() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (ldap_id, name, created_at) VALUES ('11111111', 'A', 't');
             INSERT INTO questions (title, content, category, ldap_id, created_at)
                 VALUES ('q', 'c', 'other', '11111111', 't');
             INSERT INTO answers (question_id, content, ldap_id, posted_at, updated_at, is_best)
                 VALUES (1, 'a', '11111111', 't', 't', 1);
             UPDATE questions SET best_answer_id = 1, resolved = 1 WHERE id = 1;
             DELETE FROM answers WHERE id = 1;",
        )
        .unwrap();

        let (best, resolved): (Option<i64>, bool) = conn
            .query_row(
                "SELECT best_answer_id, resolved FROM questions WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(best, None);
        assert!(resolved, "resolved flag is untouched");
    }

    #[test]
    fn failed_migration_rolls_back() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let migrations = [Migration {
            name: "001_half_applied",
            sql: "
                CREATE TABLE rollback_check (id INTEGER PRIMARY KEY);
                INSERT INTO missing_table VALUES (1);
            ",
        }];

        let err = run_migrations_from_list(&conn, &migrations)
            .expect_err("insert into a missing table should fail");
        match err {
            MigrationError::ExecutionFailed { name, .. } => assert_eq!(name, "001_half_applied"),
            other => panic!("unexpected error type: {other:?}"),
        }

        assert!(!table_exists(&conn, "rollback_check"));
        let recorded: i64 = conn
            .query_row("SELECT COUNT(*) FROM _chie_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(recorded, 0);
    }
}
