//! User registration and lookup.

use chie_types::LdapId;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::error::{require_text, BoardError};
use crate::model::User;
use crate::{now_timestamp, parse_column};

/// Registers a new user.
///
/// # Errors
///
/// Returns `BoardError::AlreadyRegistered` if the LDAP ID already has a user,
/// including when a concurrent signup won the race for the primary key.
pub fn signup(conn: &Connection, ldap_id: &LdapId, name: &str) -> Result<User, BoardError> {
    let name = require_text("name", name)?;
    let created_at = now_timestamp();

    match conn.execute(
        "INSERT INTO users (ldap_id, name, created_at) VALUES (?1, ?2, ?3)",
        params![ldap_id.as_str(), name, created_at],
    ) {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            tracing::debug!(ldap_id = %ldap_id, "signup rejected, already registered");
            return Err(BoardError::AlreadyRegistered(ldap_id.clone()));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(ldap_id = %ldap_id, "user registered");

    Ok(User {
        ldap_id: ldap_id.clone(),
        name: name.to_string(),
        created_at,
    })
}

/// Returns whether a user with this LDAP ID exists.
pub fn login(conn: &Connection, ldap_id: &LdapId) -> Result<bool, BoardError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE ldap_id = ?1)",
        [ldap_id.as_str()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Fetches a user record.
pub fn get_user(conn: &Connection, ldap_id: &LdapId) -> Result<Option<User>, BoardError> {
    let user = conn
        .query_row(
            "SELECT ldap_id, name, created_at FROM users WHERE ldap_id = ?1",
            [ldap_id.as_str()],
            |row| {
                Ok(User {
                    ldap_id: parse_column(row, 0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Fetches just the display name of a user.
pub fn get_user_name(conn: &Connection, ldap_id: &LdapId) -> Result<Option<String>, BoardError> {
    let name = conn
        .query_row(
            "SELECT name FROM users WHERE ldap_id = ?1",
            [ldap_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(name)
}
