//! Answer CRUD.

use chie_types::{LdapId, UNKNOWN_AUTHOR};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{require_text, BoardError};
use crate::model::{Answer, AnswerView};
use crate::{now_timestamp, parse_column};

const ANSWER_COLUMNS: &str =
    "id, question_id, content, ldap_id, posted_at, updated_at, is_best";

/// Posts an answer to a question.
///
/// `posted_at` and `updated_at` start out equal.
///
/// # Errors
///
/// Returns `BoardError::NotFound` if the question does not exist and
/// `BoardError::InvalidInput` if the content is blank.
pub fn add_answer(
    conn: &Connection,
    question_id: i64,
    author: &LdapId,
    content: &str,
) -> Result<Answer, BoardError> {
    require_text("content", content)?;

    let question_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM questions WHERE id = ?1)",
        [question_id],
        |row| row.get(0),
    )?;
    if !question_exists {
        return Err(BoardError::question_not_found(question_id));
    }

    let now = now_timestamp();
    let answer = conn.query_row(
        &format!(
            "INSERT INTO answers (question_id, content, ldap_id, posted_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING {ANSWER_COLUMNS}"
        ),
        params![question_id, content, author.as_str(), now],
        map_row_to_answer,
    )?;

    tracing::info!(
        question_id,
        answer_id = answer.id,
        author = %author,
        "answer added"
    );
    Ok(answer)
}

/// Retrieves a single answer.
pub fn get_answer(conn: &Connection, answer_id: i64) -> Result<Answer, BoardError> {
    conn.query_row(
        &format!("SELECT {ANSWER_COLUMNS} FROM answers WHERE id = ?1"),
        [answer_id],
        map_row_to_answer,
    )
    .optional()?
    .ok_or_else(|| BoardError::answer_not_found(answer_id))
}

/// Lists the answers to a question: the best answer first, then oldest first.
pub fn list_answers(conn: &Connection, question_id: i64) -> Result<Vec<AnswerView>, BoardError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.question_id, a.content, a.ldap_id, a.posted_at, a.updated_at,
                a.is_best, u.name
         FROM answers a
         LEFT JOIN users u ON u.ldap_id = a.ldap_id
         WHERE a.question_id = ?1
         ORDER BY a.is_best DESC, a.posted_at ASC, a.id ASC",
    )?;

    let rows = stmt.query_map([question_id], |row| {
        let user_name: Option<String> = row.get(7)?;
        Ok(AnswerView {
            answer: map_row_to_answer(row)?,
            user_name: user_name.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        })
    })?;
    let mut answers = Vec::new();
    for row in rows {
        answers.push(row?);
    }
    Ok(answers)
}

/// Replaces an answer's content and bumps `updated_at`.
///
/// The id, question and `posted_at` are left untouched.
///
/// # Errors
///
/// Returns `BoardError::NotFound` if the answer does not exist and
/// `BoardError::NotAuthor` if `editor` did not write it.
pub fn update_answer(
    conn: &Connection,
    answer_id: i64,
    editor: &LdapId,
    content: &str,
) -> Result<Answer, BoardError> {
    require_text("content", content)?;

    let updated = conn
        .query_row(
            &format!(
                "UPDATE answers SET content = ?1, updated_at = ?2
                 WHERE id = ?3 AND ldap_id = ?4
                 RETURNING {ANSWER_COLUMNS}"
            ),
            params![content, now_timestamp(), answer_id, editor.as_str()],
            map_row_to_answer,
        )
        .optional()?;

    match updated {
        Some(answer) => {
            tracing::info!(answer_id, editor = %editor, "answer updated");
            Ok(answer)
        }
        None => Err(ownership_failure(conn, answer_id, editor)),
    }
}

/// Deletes an answer.
///
/// If it was the question's best answer, the question's `best_answer_id` is
/// cleared by the schema.
///
/// # Errors
///
/// Returns `BoardError::NotFound` if the answer does not exist and
/// `BoardError::NotAuthor` if `actor` did not write it.
pub fn delete_answer(conn: &Connection, answer_id: i64, actor: &LdapId) -> Result<(), BoardError> {
    let count = conn.execute(
        "DELETE FROM answers WHERE id = ?1 AND ldap_id = ?2",
        params![answer_id, actor.as_str()],
    )?;
    if count == 0 {
        return Err(ownership_failure(conn, answer_id, actor));
    }

    tracing::info!(answer_id, actor = %actor, "answer deleted");
    Ok(())
}

/// Explains why an author-scoped write touched no rows.
fn ownership_failure(conn: &Connection, answer_id: i64, actor: &LdapId) -> BoardError {
    match get_answer(conn, answer_id) {
        Ok(_) => BoardError::NotAuthor {
            entity: "answer",
            id: answer_id,
            actor: actor.clone(),
        },
        Err(e) => e,
    }
}

fn map_row_to_answer(row: &Row) -> rusqlite::Result<Answer> {
    Ok(Answer {
        id: row.get(0)?,
        question_id: row.get(1)?,
        content: row.get(2)?,
        ldap_id: parse_column(row, 3)?,
        posted_at: row.get(4)?,
        updated_at: row.get(5)?,
        is_best: row.get(6)?,
    })
}
