mod common;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode},
};
use common::{send, signup, test_app, ASKER};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn health_check_returns_ok() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn categories_are_public() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/api/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let categories = body.as_array().unwrap();
    assert_eq!(categories.len(), 7);
    assert_eq!(categories[0]["code"], "water_treatment");
    assert_eq!(categories[0]["label"], "水処理技術");
    assert_eq!(categories[6]["code"], "other");
}

#[tokio::test]
async fn signup_returns_session_and_rejects_duplicates() {
    let app = test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "ldap_id": ASKER, "name": "Sato" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["ldap_id"], ASKER);
    assert_eq!(body["user"]["name"], "Sato");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["expires_at"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "ldap_id": ASKER, "name": "Other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains(ASKER));
}

#[tokio::test]
async fn signup_validates_input() {
    let app = test_app();

    for ldap_id in ["1234567", "123456789", "abcdefgh", ""] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users",
            None,
            Some(json!({ "ldap_id": ldap_id, "name": "Sato" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "ldap id {ldap_id:?}");
        assert!(body["error"].is_string());
    }

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "ldap_id": ASKER, "name": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_requires_registration() {
    let app = test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/session",
        None,
        Some(json!({ "ldap_id": ASKER })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    signup(&app, ASKER, "Sato").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/session",
        None,
        Some(json!({ "ldap_id": format!(" {ASKER} ") })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Sato");
}

#[tokio::test]
async fn protected_routes_require_session() {
    let app = test_app();

    for (method, uri) in [
        (Method::GET, "/api/session"),
        (Method::GET, "/api/questions"),
        (Method::GET, "/api/questions/search?q=pump"),
        (Method::GET, "/api/questions/1"),
        (Method::DELETE, "/api/answers/1"),
    ] {
        let (status, body) = send(&app, method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert!(body["error"].is_string());
    }

    let (status, _) = send(&app, Method::GET, "/api/questions", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_header_is_accepted() {
    let app = test_app();
    let token = signup(&app, ASKER, "Sato").await;

    let mut request = Request::builder()
        .uri("/api/session")
        .header("X-Chie-Session", &token)
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(common::client_addr()));

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_invalidates_token() {
    let app = test_app();
    let token = signup(&app, ASKER, "Sato").await;

    let (status, body) = send(&app, Method::GET, "/api/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["ldap_id"], ASKER);
    assert_eq!(body["token"], token.as_str());

    let (status, _) = send(&app, Method::DELETE, "/api/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/api/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
