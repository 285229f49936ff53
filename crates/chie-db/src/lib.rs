//! Storage layer for the Chie Q&A service.
//!
//! Owns the SQLite connection pool (via `r2d2`) and the schema. The three
//! tables the service uses (`users`, `questions`, `answers`) are created by
//! embedded migrations that are safe to run on every startup: a migration
//! that was already applied is skipped.
//!
//! Data access functions live in `chie-board`; they borrow a connection from
//! the pool built here and never open their own.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError, IN_MEMORY};
