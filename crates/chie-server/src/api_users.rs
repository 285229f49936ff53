//! Signup, login and session handlers, plus the category list the question
//! form is built from.

use crate::api::{with_conn, ApiError, ApiJson};
use crate::middleware::SessionContext;
use crate::session::Session;
use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
};
use chie_types::{Category, LdapId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request body for `POST /api/users`.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub ldap_id: String,
    pub name: String,
}

/// Request body for `POST /api/session`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub ldap_id: String,
}

/// One entry of `GET /api/categories`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub code: String,
    pub label: String,
}

fn parse_ldap_id(raw: &str) -> Result<LdapId, ApiError> {
    LdapId::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Handler for `POST /api/users`.
///
/// Registers the user and logs them straight in.
pub async fn signup_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let ldap_id = parse_ldap_id(&payload.ldap_id)?;

    let user = with_conn(&state, move |conn| {
        Ok(chie_board::signup(conn, &ldap_id, &payload.name)?)
    })
    .await?;

    let session = state.sessions.create(user);
    Ok((StatusCode::CREATED, Json(session)))
}

/// Handler for `POST /api/session`.
///
/// Returns 404 for an unregistered LDAP ID so the client can offer signup.
pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<Session>, ApiError> {
    let ldap_id = parse_ldap_id(&payload.ldap_id)?;

    let user = with_conn(&state, move |conn| {
        chie_board::get_user(conn, &ldap_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ldap id not registered: {}", ldap_id)))
    })
    .await?;

    tracing::info!(ldap_id = %user.ldap_id, "user logged in");
    Ok(Json(state.sessions.create(user)))
}

/// Handler for `GET /api/session`.
pub async fn current_session_handler(
    Extension(session): Extension<SessionContext>,
) -> Json<Session> {
    Json(session.0)
}

/// Handler for `DELETE /api/session`.
pub async fn logout_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
) -> StatusCode {
    state.sessions.revoke(&session.0.token);
    tracing::info!(ldap_id = %session.ldap_id(), "user logged out");
    StatusCode::NO_CONTENT
}

/// Handler for `GET /api/categories`.
pub async fn categories_handler() -> Json<Vec<CategoryEntry>> {
    Json(
        Category::ALL
            .iter()
            .map(|c| CategoryEntry {
                code: c.as_str().to_string(),
                label: c.label().to_string(),
            })
            .collect(),
    )
}
