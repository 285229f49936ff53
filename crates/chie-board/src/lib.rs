//! Questions, answers and users for the Chie Q&A service.
//!
//! One function per use case, each borrowing a [`rusqlite::Connection`] from
//! the caller's pool and returning a [`BoardError`] on failure:
//!
//! | Area | Operations |
//! |------|------------|
//! | users | [`signup`], [`login`], [`get_user`], [`get_user_name`] |
//! | questions | [`save_question`], [`get_question`], [`list_questions`], [`search_questions`], [`question_author`] |
//! | answers | [`add_answer`], [`get_answer`], [`list_answers`], [`update_answer`], [`delete_answer`] |
//! | resolution | [`set_best_answer`], [`resolve_question`], [`unresolve_question`] |
//!
//! Best-answer selection and resolution each run in a single transaction, so
//! a question is never left resolved with a half-written best answer.

mod answers;
mod error;
mod model;
mod questions;
mod resolution;
mod users;

pub use answers::{add_answer, delete_answer, get_answer, list_answers, update_answer};
pub use error::BoardError;
pub use model::{Answer, AnswerView, NewQuestion, QuestionSummary, ResolvedFilter, User};
pub use questions::{
    get_question, list_questions, question_author, save_question, search_questions,
    MAX_KEYWORD_CHARS, MAX_SEARCH_KEYWORDS,
};
pub use resolution::{resolve_question, set_best_answer, unresolve_question};
pub use users::{get_user, get_user_name, login, signup};

/// Current time as a UTC RFC 3339 timestamp with millisecond precision.
///
/// The fixed width keeps lexical and chronological order identical, which the
/// `ORDER BY` clauses rely on.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Converts a stored text column into a validated type, reporting failures the
/// way `rusqlite` reports other column conversion errors.
pub(crate) fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
