//! Question handlers: posting, listing, search, detail and resolution.
//!
//! Resolving and reopening are restricted to the asker. The ownership check
//! and the write run on the same pooled connection.

use crate::api::{with_conn, ApiError, ApiJson, ApiPath, ApiQuery};
use crate::middleware::SessionContext;
use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
};
use chie_board::{AnswerView, NewQuestion, QuestionSummary, ResolvedFilter};
use chie_types::{split_tags, Category, LdapId};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tags as a list or as the comma-separated string the form submits.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Joined(String),
}

impl Default for TagsInput {
    fn default() -> Self {
        TagsInput::List(Vec::new())
    }
}

impl TagsInput {
    fn into_list(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => tags,
            TagsInput::Joined(raw) => split_tags(&raw),
        }
    }
}

/// Request body for `POST /api/questions`.
#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub title: String,
    pub content: String,
    /// Category code or display label.
    pub category: String,
    #[serde(default)]
    pub tags: TagsInput,
}

/// Response body for `POST /api/questions`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateQuestionResponse {
    pub id: i64,
}

/// Query string for `GET /api/questions`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: ResolvedFilter,
}

/// Query string for `GET /api/questions/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Response body for `GET /api/questions/{id}`.
#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    pub question: QuestionSummary,
    pub answers: Vec<AnswerView>,
}

/// Request body for `POST /api/questions/{id}/resolve`.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub answer_id: i64,
    #[serde(default)]
    pub thank_message: Option<String>,
}

/// Handler for `POST /api/questions`.
pub async fn create_question_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    ApiJson(payload): ApiJson<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<CreateQuestionResponse>), ApiError> {
    let category: Category = payload
        .category
        .parse()
        .map_err(|e: chie_types::ParseCategoryError| ApiError::BadRequest(e.to_string()))?;

    let question = NewQuestion {
        title: payload.title,
        content: payload.content,
        category,
        tags: payload.tags.into_list(),
        author: session.ldap_id().clone(),
    };

    let id = with_conn(&state, move |conn| {
        Ok(chie_board::save_question(conn, &question)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(CreateQuestionResponse { id })))
}

/// Handler for `GET /api/questions`.
pub async fn list_questions_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<QuestionSummary>>, ApiError> {
    let questions = with_conn(&state, move |conn| {
        Ok(chie_board::list_questions(conn, query.status)?)
    })
    .await?;
    Ok(Json(questions))
}

/// Handler for `GET /api/questions/search`.
pub async fn search_questions_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<QuestionSummary>>, ApiError> {
    let questions = with_conn(&state, move |conn| {
        Ok(chie_board::search_questions(conn, &query.q)?)
    })
    .await?;
    Ok(Json(questions))
}

/// Handler for `GET /api/questions/{id}`.
pub async fn get_question_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiPath(question_id): ApiPath<i64>,
) -> Result<Json<QuestionDetail>, ApiError> {
    let detail = with_conn(&state, move |conn| {
        let question = chie_board::get_question(conn, question_id)?;
        let answers = chie_board::list_answers(conn, question_id)?;
        Ok(QuestionDetail { question, answers })
    })
    .await?;
    Ok(Json(detail))
}

/// Handler for `POST /api/questions/{id}/resolve`.
pub async fn resolve_question_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    ApiPath(question_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ResolveRequest>,
) -> Result<Json<QuestionSummary>, ApiError> {
    let actor = session.ldap_id().clone();

    let question = with_conn(&state, move |conn| {
        require_asker(conn, question_id, &actor)?;
        chie_board::resolve_question(
            conn,
            question_id,
            payload.answer_id,
            payload.thank_message.as_deref(),
        )?;
        Ok(chie_board::get_question(conn, question_id)?)
    })
    .await?;
    Ok(Json(question))
}

/// Handler for `POST /api/questions/{id}/unresolve`.
pub async fn unresolve_question_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    ApiPath(question_id): ApiPath<i64>,
) -> Result<Json<QuestionSummary>, ApiError> {
    let actor = session.ldap_id().clone();

    let question = with_conn(&state, move |conn| {
        require_asker(conn, question_id, &actor)?;
        chie_board::unresolve_question(conn, question_id)?;
        Ok(chie_board::get_question(conn, question_id)?)
    })
    .await?;
    Ok(Json(question))
}

fn require_asker(conn: &Connection, question_id: i64, actor: &LdapId) -> Result<(), ApiError> {
    let asker = chie_board::question_author(conn, question_id)?;
    if &asker != actor {
        tracing::debug!(question_id, actor = %actor, "resolution attempt by non-asker");
        return Err(ApiError::Forbidden(format!(
            "only the asker can change resolution of question {}",
            question_id
        )));
    }
    Ok(())
}
