//! Shared API plumbing: the error type every handler returns, extractors
//! whose rejections use it, and the helper that runs board operations on the
//! blocking pool.

use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use chie_board::BoardError;
use rusqlite::Connection;
use std::sync::Arc;
use thiserror::Error;

/// Seconds a client should wait before retrying after a busy database.
const BUSY_RETRY_AFTER_SECS: &str = "1";

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// A request the extractors could not parse, with axum's status.
    #[error("rejected request: {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("database busy")]
    Busy,
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Rejected { status, message } => (status, message),
            ApiError::Busy => {
                tracing::warn!("database busy, asking client to retry");
                let body = Json(serde_json::json!({
                    "error": "database is busy, retry shortly"
                }));
                let mut response = (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from_static(BUSY_RETRY_AFTER_SECS),
                );
                return response;
            }
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<BoardError> for ApiError {
    fn from(e: BoardError) -> Self {
        if e.is_busy() {
            return ApiError::Busy;
        }
        match e {
            BoardError::AlreadyRegistered(_) => ApiError::Conflict(e.to_string()),
            BoardError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            BoardError::NotAuthor { .. } => ApiError::Forbidden(e.to_string()),
            BoardError::AnswerNotInQuestion { .. } | BoardError::InvalidInput(_) => {
                ApiError::BadRequest(e.to_string())
            }
            BoardError::Database(_) => ApiError::InternalServerError(e.to_string()),
        }
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(e: r2d2::Error) -> Self {
        ApiError::InternalServerError(format!("db connection failed: {}", e))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// JSON request body. Rejections are answered as [`ApiError`].
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Path parameters. Rejections are answered as [`ApiError`].
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Query string. Rejections are answered as [`ApiError`].
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Runs `f` against a pooled connection on the blocking thread pool.
pub(crate) async fn with_conn<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        f(&conn)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chie_types::LdapId;

    fn status_of(err: BoardError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn board_errors_map_to_statuses() {
        let id = LdapId::parse("12345678").unwrap();
        assert_eq!(
            status_of(BoardError::AlreadyRegistered(id.clone())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(BoardError::NotFound {
                entity: "question",
                id: "1".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(BoardError::NotAuthor {
                entity: "answer",
                id: 1,
                actor: id
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(BoardError::AnswerNotInQuestion {
                answer_id: 1,
                question_id: 2
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(BoardError::InvalidInput("title is required".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(BoardError::Database(rusqlite::Error::QueryReturnedNoRows)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn busy_database_maps_to_503_with_retry_after() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let response = ApiError::from(BoardError::Database(busy)).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }
}
