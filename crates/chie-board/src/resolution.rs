//! Best-answer selection and question resolution.
//!
//! Each public function runs in its own transaction. Marking the best answer
//! touches both `answers.is_best` and `questions.best_answer_id`, and
//! resolving additionally sets `questions.resolved`; none of these writes is
//! visible unless all of them commit.
//!
//! The transactions begin `IMMEDIATE`, taking the write lock before their
//! first read.

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::error::BoardError;

/// Marks `answer_id` as the best answer of `question_id`.
///
/// Clears any previous best answer of the question. Does not change the
/// resolved flag.
///
/// # Errors
///
/// Returns `BoardError::NotFound` for a missing question or answer and
/// `BoardError::AnswerNotInQuestion` if the answer belongs elsewhere.
pub fn set_best_answer(
    conn: &Connection,
    question_id: i64,
    answer_id: i64,
) -> Result<(), BoardError> {
    let tx = write_transaction(conn)?;
    apply_best_answer(&tx, question_id, answer_id)?;
    tx.commit()?;

    tracing::info!(question_id, answer_id, "best answer set");
    Ok(())
}

/// Resolves a question: selects its best answer, sets `resolved`, and stores
/// the optional thank-you message, all in one transaction.
///
/// A blank thank-you message is stored as `NULL`.
///
/// # Errors
///
/// Same as [`set_best_answer`]; on error nothing is written.
pub fn resolve_question(
    conn: &Connection,
    question_id: i64,
    answer_id: i64,
    thank_message: Option<&str>,
) -> Result<(), BoardError> {
    let thank_message = thank_message.map(str::trim).filter(|m| !m.is_empty());

    let tx = write_transaction(conn)?;
    apply_best_answer(&tx, question_id, answer_id)?;
    tx.execute(
        "UPDATE questions SET resolved = 1, thank_message = ?1 WHERE id = ?2",
        params![thank_message, question_id],
    )?;
    tx.commit()?;

    tracing::info!(
        question_id,
        answer_id,
        thanked = thank_message.is_some(),
        "question resolved"
    );
    Ok(())
}

/// Reopens a question.
///
/// Clears the resolved flag, the best-answer reference and the thank-you
/// message, and drops the best-answer flag from its answers.
///
/// # Errors
///
/// Returns `BoardError::NotFound` if the question does not exist.
pub fn unresolve_question(conn: &Connection, question_id: i64) -> Result<(), BoardError> {
    let tx = write_transaction(conn)?;
    let count = tx.execute(
        "UPDATE questions
         SET resolved = 0, best_answer_id = NULL, thank_message = NULL
         WHERE id = ?1",
        [question_id],
    )?;
    if count == 0 {
        return Err(BoardError::question_not_found(question_id));
    }
    tx.execute(
        "UPDATE answers SET is_best = 0 WHERE question_id = ?1 AND is_best = 1",
        [question_id],
    )?;
    tx.commit()?;

    tracing::info!(question_id, "question reopened");
    Ok(())
}

/// Begins a transaction that holds the write lock from the start.
fn write_transaction(conn: &Connection) -> rusqlite::Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
}

/// The shared best-answer writes. Runs inside the caller's transaction.
fn apply_best_answer(
    conn: &Connection,
    question_id: i64,
    answer_id: i64,
) -> Result<(), BoardError> {
    let question_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM questions WHERE id = ?1)",
        [question_id],
        |row| row.get(0),
    )?;
    if !question_exists {
        return Err(BoardError::question_not_found(question_id));
    }

    let owner: i64 = conn
        .query_row(
            "SELECT question_id FROM answers WHERE id = ?1",
            [answer_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| BoardError::answer_not_found(answer_id))?;
    if owner != question_id {
        return Err(BoardError::AnswerNotInQuestion {
            answer_id,
            question_id,
        });
    }

    conn.execute(
        "UPDATE answers SET is_best = 0 WHERE question_id = ?1 AND is_best = 1",
        [question_id],
    )?;
    conn.execute("UPDATE answers SET is_best = 1 WHERE id = ?1", [answer_id])?;
    conn.execute(
        "UPDATE questions SET best_answer_id = ?1 WHERE id = ?2",
        params![answer_id, question_id],
    )?;
    Ok(())
}
