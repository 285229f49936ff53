//! Posting, listing and searching questions.

use chie_types::{join_tags, LdapId, UNKNOWN_AUTHOR};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::{require_text, BoardError};
use crate::model::{NewQuestion, QuestionSummary, ResolvedFilter};
use crate::{now_timestamp, parse_column};

/// Column list shared by every question read. Column order is what
/// [`map_row_to_question`] expects.
const QUESTION_SELECT: &str = "SELECT
        q.id, q.title, q.content, q.category, q.tags, q.ldap_id, q.created_at,
        q.resolved, q.best_answer_id, q.thank_message, u.name,
        (SELECT COUNT(*) FROM answers a WHERE a.question_id = q.id)
    FROM questions q
    LEFT JOIN users u ON u.ldap_id = q.ldap_id";

/// Most distinct keywords a search may carry. Each keyword adds one clause
/// to the `WHERE` tree, which SQLite caps at a depth of 1000.
pub const MAX_SEARCH_KEYWORDS: usize = 32;

/// Longest keyword accepted by search, in characters.
pub const MAX_KEYWORD_CHARS: usize = 100;

/// Saves a new question and returns its id.
///
/// # Errors
///
/// Returns `BoardError::InvalidInput` if the title or content is blank, and
/// `BoardError::NotFound` if the author has no user record.
pub fn save_question(conn: &Connection, question: &NewQuestion) -> Result<i64, BoardError> {
    let title = require_text("title", &question.title)?;
    require_text("content", &question.content)?;

    let asker_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE ldap_id = ?1)",
        [question.author.as_str()],
        |row| row.get(0),
    )?;
    if !asker_exists {
        return Err(BoardError::NotFound {
            entity: "user",
            id: question.author.to_string(),
        });
    }

    conn.execute(
        "INSERT INTO questions (title, content, category, tags, ldap_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            title,
            question.content,
            question.category.as_str(),
            join_tags(&question.tags),
            question.author.as_str(),
            now_timestamp(),
        ],
    )?;
    let id = conn.last_insert_rowid();

    tracing::info!(
        question_id = id,
        author = %question.author,
        category = question.category.as_str(),
        "question saved"
    );
    Ok(id)
}

/// Retrieves a single question.
pub fn get_question(conn: &Connection, question_id: i64) -> Result<QuestionSummary, BoardError> {
    conn.query_row(
        &format!("{QUESTION_SELECT} WHERE q.id = ?1"),
        [question_id],
        map_row_to_question,
    )
    .optional()?
    .ok_or_else(|| BoardError::question_not_found(question_id))
}

/// Returns the asker of a question.
pub fn question_author(conn: &Connection, question_id: i64) -> Result<LdapId, BoardError> {
    conn.query_row(
        "SELECT ldap_id FROM questions WHERE id = ?1",
        [question_id],
        |row| parse_column(row, 0),
    )
    .optional()?
    .ok_or_else(|| BoardError::question_not_found(question_id))
}

/// Lists questions, newest first.
pub fn list_questions(
    conn: &Connection,
    filter: ResolvedFilter,
) -> Result<Vec<QuestionSummary>, BoardError> {
    let where_clause = match filter {
        ResolvedFilter::All => "",
        ResolvedFilter::Open => " WHERE q.resolved = 0",
        ResolvedFilter::Resolved => " WHERE q.resolved = 1",
    };
    let sql = format!("{QUESTION_SELECT}{where_clause} ORDER BY q.created_at DESC, q.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_row_to_question)?;
    let mut questions = Vec::new();
    for row in rows {
        questions.push(row?);
    }
    Ok(questions)
}

/// Keyword search over title, content and tags.
///
/// `keywords` is split on whitespace. A question matches when every keyword
/// occurs in at least one of the three fields. Matching is a substring test
/// that ignores ASCII case. Blank input yields no results, and repeated
/// keywords count once.
///
/// # Errors
///
/// Returns `BoardError::InvalidInput` for more than [`MAX_SEARCH_KEYWORDS`]
/// distinct keywords or a keyword longer than [`MAX_KEYWORD_CHARS`].
pub fn search_questions(
    conn: &Connection,
    keywords: &str,
) -> Result<Vec<QuestionSummary>, BoardError> {
    let mut distinct: Vec<&str> = Vec::new();
    for keyword in keywords.split_whitespace() {
        if keyword.chars().count() > MAX_KEYWORD_CHARS {
            return Err(BoardError::InvalidInput(format!(
                "search keywords are limited to {MAX_KEYWORD_CHARS} characters"
            )));
        }
        if !distinct.iter().any(|seen| seen.eq_ignore_ascii_case(keyword)) {
            distinct.push(keyword);
        }
    }
    if distinct.is_empty() {
        return Ok(Vec::new());
    }
    if distinct.len() > MAX_SEARCH_KEYWORDS {
        return Err(BoardError::InvalidInput(format!(
            "at most {MAX_SEARCH_KEYWORDS} search keywords are allowed"
        )));
    }

    let patterns: Vec<String> = distinct
        .iter()
        .map(|k| format!("%{}%", escape_like(k)))
        .collect();

    let clauses: Vec<String> = (1..=patterns.len())
        .map(|idx| {
            format!(
                "(q.title LIKE ?{idx} ESCAPE '\\' \
                 OR q.content LIKE ?{idx} ESCAPE '\\' \
                 OR q.tags LIKE ?{idx} ESCAPE '\\')"
            )
        })
        .collect();
    let sql = format!(
        "{QUESTION_SELECT} WHERE {} ORDER BY q.created_at DESC, q.id DESC",
        clauses.join(" AND ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(patterns.iter()), map_row_to_question)?;
    let mut questions = Vec::new();
    for row in rows {
        questions.push(row?);
    }

    tracing::debug!(
        keywords = patterns.len(),
        hits = questions.len(),
        "question search"
    );
    Ok(questions)
}

/// Escapes `LIKE` wildcards so a keyword matches literally.
fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn map_row_to_question(row: &Row) -> rusqlite::Result<QuestionSummary> {
    let user_name: Option<String> = row.get(10)?;
    Ok(QuestionSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category: parse_column(row, 3)?,
        tags: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        ldap_id: parse_column(row, 5)?,
        created_at: row.get(6)?,
        resolved: row.get(7)?,
        best_answer_id: row.get(8)?,
        thank_message: row.get(9)?,
        user_name: user_name.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        answer_count: row.get(11)?,
    })
}
