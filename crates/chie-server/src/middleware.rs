use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chie_types::LdapId;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::api::ApiError;
use crate::session::Session;
use crate::AppState;

/// Header carrying the session token, as an alternative to `Authorization`.
pub const SESSION_HEADER: &str = "x-chie-session";

/// Length of a rate limiting window.
const WINDOW: Duration = Duration::from_secs(60);

/// Number of tracked keys above which expired windows are evicted.
const EVICTION_THRESHOLD: usize = 10_000;

/// The session of the user making a request, stored in request extensions.
#[derive(Clone, Debug)]
pub struct SessionContext(pub Session);

impl SessionContext {
    pub fn ldap_id(&self) -> &LdapId {
        &self.0.user.ldap_id
    }
}

/// Extracts the session token from `X-Chie-Session` or `Authorization: Bearer`.
///
/// Returns `Ok(None)` if neither header is present.
fn session_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    if let Some(val) = headers.get(SESSION_HEADER) {
        let token = val
            .to_str()
            .map_err(|_| ApiError::Unauthorized("malformed session header".to_string()))?;
        return Ok(Some(token.trim().to_string()));
    }
    if let Some(val) = headers.get(header::AUTHORIZATION) {
        let val_str = val
            .to_str()
            .map_err(|_| ApiError::Unauthorized("malformed authorization header".to_string()))?;
        return match val_str.strip_prefix("Bearer ") {
            Some(token) => Ok(Some(token.trim().to_string())),
            None => Err(ApiError::Unauthorized(
                "expected a bearer token".to_string(),
            )),
        };
    }
    Ok(None)
}

/// Middleware that resolves the session token and inserts a [`SessionContext`].
///
/// Requests without a live session are rejected with 401.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let token = session_token(req.headers())?
        .ok_or_else(|| ApiError::Unauthorized("login required".to_string()))?;

    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or_else(|| ApiError::InternalServerError("app state missing".to_string()))?
        .clone();

    let session = state
        .sessions
        .get(&token)
        .ok_or_else(|| ApiError::Unauthorized("session expired or unknown".to_string()))?;

    req.extensions_mut().insert(SessionContext(session));

    Ok(next.run(req).await)
}

/// Rate limiting key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    /// Rate limit by IP address.
    Ip(IpAddr),
    /// Rate limit by logged-in user.
    User(LdapId),
    /// Signup and login attempts, counted per IP in their own bucket.
    Auth(IpAddr),
}

/// In-memory rate limiter state.
///
/// Uses a simple fixed window counter.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    state: Arc<Mutex<HashMap<RateLimitKey, (u32, Instant)>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if the request is allowed.
    ///
    /// Returns `true` if allowed, `false` if limit exceeded.
    pub fn check(&self, key: RateLimitKey, limit: u32) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // A stale counter is harmless; refusing everything is not.
                tracing::error!("rate limiter lock poisoned, recovering with stale state");
                poisoned.into_inner()
            }
        };
        let now = Instant::now();

        if state.len() > EVICTION_THRESHOLD {
            state.retain(|_, (_, start)| now.duration_since(*start) <= WINDOW);
        }

        let (count, start) = state.entry(key).or_insert((0, now));

        if now.duration_since(*start) > WINDOW {
            *count = 1;
            *start = now;
            true
        } else {
            *count += 1;
            *count <= limit
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the request is a signup or login attempt.
fn is_auth_attempt(method: &Method, path: &str) -> bool {
    *method == Method::POST && (path == "/api/users" || path == "/api/session")
}

/// Rate limiting middleware.
///
/// Signup and login attempts are counted per IP against the stricter
/// `auth_limit`. Other requests carrying a live session are counted per user,
/// the rest per IP.
pub async fn rate_limit_middleware(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or_else(|| ApiError::InternalServerError("app state missing".to_string()))?
        .clone();

    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let session = session_token(req.headers())
        .ok()
        .flatten()
        .and_then(|token| state.sessions.get(&token));

    let limits = state.rate_limits;
    let (key, limit) = if is_auth_attempt(req.method(), req.uri().path()) {
        match ip {
            Some(ip) => (RateLimitKey::Auth(ip), limits.auth_limit),
            None => {
                return Err(missing_connect_info());
            }
        }
    } else if let Some(session) = session {
        (RateLimitKey::User(session.user.ldap_id), limits.default_limit)
    } else if let Some(ip) = ip {
        (RateLimitKey::Ip(ip), limits.default_limit)
    } else {
        return Err(missing_connect_info());
    };

    if !state.rate_limiter.check(key.clone(), limit) {
        tracing::debug!(?key, limit, "rate limit exceeded");
        return Ok((
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "60")],
            Json(serde_json::json!({ "error": "rate limit exceeded" })),
        )
            .into_response());
    }

    Ok(next.run(req).await)
}

fn missing_connect_info() -> ApiError {
    ApiError::InternalServerError("connect info missing, cannot rate limit".to_string())
}
