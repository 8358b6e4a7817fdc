//! Router-level tests for the authentication service over the in-memory store

use auth::{AppState, rate_limiter::RateLimiterConfig, routes::create_router};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{
    jwt::{JwtConfig, JwtService},
    store::Repositories,
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let repositories = Repositories::in_memory();
    let jwt = JwtService::new(JwtConfig {
        secret: "test-secret".to_string(),
        expires_in: 3600,
    });
    let state = AppState::new(
        repositories.users.clone(),
        jwt,
        RateLimiterConfig {
            max_attempts: 3,
            window_seconds: 300,
            ban_duration_seconds: 60,
        },
    );
    create_router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_auth(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn signup(app: &Router, email: &str) -> (StatusCode, Value) {
    send(
        app,
        post_json(
            "/auth/signup",
            json!({"name": "Asha", "email": email, "password": "secret1"}),
        ),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, get_with_auth("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_signup_issues_token_and_hides_hash() {
    let app = app();
    let (status, body) = signup(&app, "asha@example.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], "asha@example.com");
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_duplicate_signup_is_rejected() {
    let app = app();
    signup(&app, "asha@example.com").await;
    let (status, body) = signup(&app, "ASHA@example.com ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "User with this email already exists");
}

#[tokio::test]
async fn test_signup_validation() {
    let app = app();
    let (status, body) = send(
        &app,
        post_json(
            "/auth/signup",
            json!({"name": "Asha", "email": "asha@example.com", "password": "nodigits"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Password must contain at least one number");

    let (status, _) = send(
        &app,
        post_json(
            "/auth/signup",
            json!({"name": " A ", "email": "asha@example.com", "password": "secret1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, post_json("/auth/signup", json!("not an object"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = app();
    signup(&app, "asha@example.com").await;

    let (status, body) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "Asha@Example.com", "password": "secret1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        get_with_auth("/auth/me", Some(&format!("Bearer {}", token))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Asha");
}

#[tokio::test]
async fn test_bad_credentials_share_one_message() {
    let app = app();
    signup(&app, "asha@example.com").await;

    let (status, wrong_password) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "asha@example.com", "password": "wrong1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_email) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "nobody@example.com", "password": "secret1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["message"], "Invalid email or password");
    assert_eq!(wrong_password["message"], unknown_email["message"]);
}

#[tokio::test]
async fn test_repeated_failures_are_throttled() {
    let app = app();
    signup(&app, "asha@example.com").await;

    let wrong = json!({"email": "asha@example.com", "password": "wrong1"});
    for _ in 0..3 {
        let (status, _) = send(&app, post_json("/auth/login", wrong.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "asha@example.com", "password": "secret1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_gate_messages() {
    let app = app();

    let (status, body) = send(&app, get_with_auth("/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied. No token provided.");

    let (_, body) = send(&app, get_with_auth("/auth/me", Some("Bearer "))).await;
    assert_eq!(body["message"], "Access denied. Invalid token format.");

    let (_, body) = send(&app, get_with_auth("/auth/me", Some("Bearer not.a.jwt"))).await;
    assert_eq!(body["message"], "Invalid token.");
}
