#![allow(dead_code)]

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode},
    Router,
};
use chie_db::{create_pool, DbRuntimeSettings, IN_MEMORY};
use chie_server::{
    app, config::RateLimitConfig, middleware::RateLimiter, session::SessionStore, AppState,
};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tower::ServiceExt;

pub const ASKER: &str = "11111111";
pub const ANSWERER: &str = "22222222";

/// Builds the router over a fresh in-memory database.
pub fn test_app() -> Router {
    test_app_with_limits(RateLimitConfig {
        default_limit: 10_000,
        auth_limit: 10_000,
    })
}

pub fn test_app_with_limits(rate_limits: RateLimitConfig) -> Router {
    let pool = create_pool(IN_MEMORY, DbRuntimeSettings::default()).unwrap();
    {
        let conn = pool.get().unwrap();
        chie_db::run_migrations(&conn).unwrap();
    }

    app(AppState {
        pool,
        sessions: SessionStore::new(3600),
        rate_limiter: RateLimiter::new(),
        rate_limits,
    })
}

pub fn client_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 12345)
}

/// Sends one request and returns the status and JSON body (`Null` if empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let mut request = builder.body(body).unwrap();
    request.extensions_mut().insert(ConnectInfo(client_addr()));

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Registers a user and returns their session token.
pub async fn signup(app: &Router, ldap_id: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/users",
        None,
        Some(serde_json::json!({ "ldap_id": ldap_id, "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

/// Posts a question and returns its id.
pub async fn ask(app: &Router, token: &str, title: &str, content: &str, tags: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/questions",
        Some(token),
        Some(serde_json::json!({
            "title": title,
            "content": content,
            "category": "water_treatment",
            "tags": tags,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "ask failed: {body}");
    body["id"].as_i64().unwrap()
}

/// Posts an answer and returns its id.
pub async fn answer(app: &Router, token: &str, question_id: i64, content: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        &format!("/api/questions/{question_id}/answers"),
        Some(token),
        Some(serde_json::json!({ "content": content })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "answer failed: {body}");
    body["id"].as_i64().unwrap()
}
