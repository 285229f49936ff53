//! Error types for board operations.

use chie_types::LdapId;
use rusqlite::ErrorCode;

/// Errors that can occur during user, question and answer operations.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// A database operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Signup for an LDAP ID that already has a user record.
    #[error("ldap id already registered: {0}")]
    AlreadyRegistered(LdapId),

    /// The referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The acting user does not own the row they tried to change.
    #[error("{actor} is not the author of {entity} {id}")]
    NotAuthor {
        entity: &'static str,
        id: i64,
        actor: LdapId,
    },

    /// The chosen best answer belongs to a different question.
    #[error("answer {answer_id} does not belong to question {question_id}")]
    AnswerNotInQuestion { answer_id: i64, question_id: i64 },

    /// A required field was blank or otherwise unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl BoardError {
    pub(crate) fn question_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "question",
            id: id.to_string(),
        }
    }

    pub(crate) fn answer_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "answer",
            id: id.to_string(),
        }
    }

    /// Whether the failure was lock contention that outlasted the busy timeout.
    ///
    /// Callers may surface these as retryable rather than as internal errors.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked
        )
    }
}

/// Rejects blank text and returns it trimmed.
pub(crate) fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str, BoardError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BoardError::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed)
}
