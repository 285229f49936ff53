mod common;

use axum::http::{Method, StatusCode};
use chie_server::config::RateLimitConfig;
use common::{send, signup, test_app_with_limits, ASKER};
use serde_json::json;

#[tokio::test]
async fn login_attempts_use_the_auth_limit() {
    let app = test_app_with_limits(RateLimitConfig {
        default_limit: 100,
        auth_limit: 2,
    });

    for i in 1..=4 {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/session",
            None,
            Some(json!({ "ldap_id": ASKER })),
        )
        .await;
        if i <= 2 {
            assert_eq!(status, StatusCode::NOT_FOUND, "attempt {i} reaches handler");
        } else {
            assert_eq!(
                status,
                StatusCode::TOO_MANY_REQUESTS,
                "attempt {i} should be limited"
            );
        }
    }

    // Public reads are counted in a separate bucket.
    let (status, _) = send(&app, Method::GET, "/api/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn limited_response_carries_retry_after() {
    let app = test_app_with_limits(RateLimitConfig {
        default_limit: 1,
        auth_limit: 10,
    });

    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let mut request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(axum::extract::ConnectInfo(common::client_addr()));
    let response = tower::ServiceExt::oneshot(app.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "60");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "rate limit exceeded");
}

#[tokio::test]
async fn logged_in_users_are_counted_per_user() {
    let app = test_app_with_limits(RateLimitConfig {
        default_limit: 2,
        auth_limit: 10,
    });
    let token = signup(&app, ASKER, "Sato").await;

    // Two anonymous requests exhaust the per-IP bucket...
    for _ in 0..2 {
        let (status, _) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // ...while the user's own bucket is untouched.
    let (status, _) = send(&app, Method::GET, "/api/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_connect_info_is_rejected() {
    let app = common::test_app();
    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "internal server error");
}
