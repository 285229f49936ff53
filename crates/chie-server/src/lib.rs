//! Chie server library logic.

pub mod api;
pub mod api_answers;
pub mod api_questions;
pub mod api_users;
pub mod background;
pub mod config;
pub mod middleware;
pub mod session;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chie_db::DbPool;
use config::RateLimitConfig;
use middleware::RateLimiter;
use serde_json::{json, Value};
use session::SessionStore;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Logged-in sessions.
    pub sessions: SessionStore,
    /// Rate limiter state.
    pub rate_limiter: RateLimiter,
    /// Per-minute request limits.
    pub rate_limits: RateLimitConfig,
}

/// Maximum request body size (256 KiB).
const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/api/questions",
            get(api_questions::list_questions_handler)
                .post(api_questions::create_question_handler),
        )
        .route(
            "/api/questions/search",
            get(api_questions::search_questions_handler),
        )
        .route(
            "/api/questions/{questionId}",
            get(api_questions::get_question_handler),
        )
        .route(
            "/api/questions/{questionId}/answers",
            post(api_answers::add_answer_handler),
        )
        .route(
            "/api/questions/{questionId}/resolve",
            post(api_questions::resolve_question_handler),
        )
        .route(
            "/api/questions/{questionId}/unresolve",
            post(api_questions::unresolve_question_handler),
        )
        .route(
            "/api/answers/{answerId}",
            put(api_answers::update_answer_handler).delete(api_answers::delete_answer_handler),
        )
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/health", get(health))
        .route("/api/categories", get(api_users::categories_handler))
        .route("/api/users", post(api_users::signup_handler))
        .route(
            "/api/session",
            post(api_users::login_handler).merge(
                get(api_users::current_session_handler)
                    .delete(api_users::logout_handler)
                    .route_layer(axum::middleware::from_fn(middleware::auth_middleware)),
            ),
        )
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::rate_limit_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
        .layer(TraceLayer::new_for_http())
}
