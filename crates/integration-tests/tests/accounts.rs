//! Registration, login and the access gate, end to end.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use shopfloor_core::UserId;
use shopfloor_integration_tests::{PASSWORD, TestApp, issuer_with_ttl};

#[tokio::test]
async fn test_register_and_login_by_email_or_phone() {
    let app = TestApp::new();
    let id = app.register("Alice", "a@x.com", "555-0001").await;
    assert_eq!(id, UserId::new(1));

    let by_email = app.login("a@x.com").await;
    let by_phone = app.login("555-0001").await;

    for token in [&by_email, &by_phone] {
        let (status, body) = app.get("/profile/", Some(token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);
        assert_eq!(body["email"], "a@x.com");
        assert_eq!(body["phone"], "555-0001");
        assert_eq!(body["name"], "Alice");
        assert!(body.get("password_hash").is_none());
    }
}

#[tokio::test]
async fn test_duplicate_email_conflicts_and_creates_nothing() {
    let app = TestApp::new();
    app.register("Alice", "a@x.com", "555-0001").await;

    let body = json!({
        "name": "Mallory",
        "email": "a@x.com",
        "phone": "555-0002",
        "password": PASSWORD,
    });
    let (status, body) = app.post("/users/", None, body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("User already exists"), "{detail}");

    // The rejected phone number was not claimed
    let id = app.register("Bob", "b@x.com", "555-0002").await;
    assert_eq!(id, UserId::new(2));
}

#[tokio::test]
async fn test_duplicate_phone_conflicts() {
    let app = TestApp::new();
    app.register("Alice", "a@x.com", "555-0001").await;

    let body = json!({
        "name": "Bob",
        "email": "b@x.com",
        "phone": "555-0001",
        "password": PASSWORD,
    });
    let (status, _) = app.post("/users/", None, body).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_registration_validation() {
    let app = TestApp::new();

    let cases = [
        json!({ "name": "A", "email": "not-an-email", "phone": "555-0001", "password": PASSWORD }),
        json!({ "name": "A", "email": "a@x.com", "phone": "call me", "password": PASSWORD }),
        json!({ "name": "", "email": "a@x.com", "phone": "555-0001", "password": PASSWORD }),
        json!({ "name": "A", "email": "a@x.com", "phone": "555-0001", "password": "short" }),
        json!({ "name": "A", "email": "a@x.com" }),
    ];
    for body in cases {
        let (status, response) = app.post("/users/", None, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body} -> {response}");
        assert!(response["detail"].is_string());
    }
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.register("Alice", "a@x.com", "555-0001").await;

    let attempts = [
        json!({ "identifier": "a@x.com", "password": "wrong password" }),
        json!({ "identifier": "nobody@x.com", "password": PASSWORD }),
        json!({ "identifier": "555-9999", "password": PASSWORD }),
        json!({ "identifier": "???", "password": PASSWORD }),
    ];
    for attempt in attempts {
        let (status, body) = app.post("/users/login", None, attempt).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid credentials");
    }
}

#[tokio::test]
async fn test_missing_or_malformed_token_is_rejected() {
    let app = TestApp::new();

    let (status, body) = app.get("/profile/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Could not validate credentials");

    let (status, _) = app.get("/profile/", Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_another_secret_is_rejected() {
    let app = TestApp::new();
    let id = app.register("Alice", "a@x.com", "555-0001").await;

    let forged = shopfloor_api::services::TokenIssuer::new(
        &secrecy::SecretString::from("Zq8#Lm4!Wp1@Rt7$Yx3%Kc9^Nv5&Hb2*".to_owned()),
        chrono::Duration::minutes(30),
    )
    .issue(id)
    .unwrap();

    let (status, _) = app.get("/profile/", Some(&forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::new();
    let id = app.register("Alice", "a@x.com", "555-0001").await;

    let expired = issuer_with_ttl(chrono::Duration::seconds(-60))
        .issue(id)
        .unwrap();

    let (status, _) = app.get("/profile/", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_for_unknown_user_is_rejected() {
    let app = TestApp::new();
    let ghost = issuer_with_ttl(chrono::Duration::minutes(5))
        .issue(UserId::new(42))
        .unwrap();

    let (status, _) = app.get("/profile/", Some(&ghost)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "trace-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_readiness_reports_store() {
    let app = TestApp::new();
    let (status, _) = app.get("/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}
