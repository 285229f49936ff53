//! Answer handlers. Edits and deletions are limited to the answer's author.

use crate::api::{with_conn, ApiError, ApiJson, ApiPath};
use crate::middleware::SessionContext;
use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
};
use chie_board::{Answer, AnswerView};
use serde::Deserialize;
use std::sync::Arc;

/// Request body for posting or editing an answer.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub content: String,
}

/// Handler for `POST /api/questions/{id}/answers`.
pub async fn add_answer_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    ApiPath(question_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<AnswerRequest>,
) -> Result<(StatusCode, Json<AnswerView>), ApiError> {
    let author = session.ldap_id().clone();

    let answer = with_conn(&state, move |conn| {
        Ok(chie_board::add_answer(
            conn,
            question_id,
            &author,
            &payload.content,
        )?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(AnswerView {
            answer,
            user_name: session.0.user.name,
        }),
    ))
}

/// Handler for `PUT /api/answers/{id}`.
pub async fn update_answer_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    ApiPath(answer_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<AnswerRequest>,
) -> Result<Json<Answer>, ApiError> {
    let editor = session.ldap_id().clone();

    let answer = with_conn(&state, move |conn| {
        Ok(chie_board::update_answer(
            conn,
            answer_id,
            &editor,
            &payload.content,
        )?)
    })
    .await?;
    Ok(Json(answer))
}

/// Handler for `DELETE /api/answers/{id}`.
pub async fn delete_answer_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    ApiPath(answer_id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let actor = session.ldap_id().clone();

    with_conn(&state, move |conn| {
        Ok(chie_board::delete_answer(conn, answer_id, &actor)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
