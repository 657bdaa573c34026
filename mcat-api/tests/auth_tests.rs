//! Integration tests for signup, token login and bearer-protected routes

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mcat_api::{build_router, AppState};
use mcat_common::auth::TokenClaims;
use mcat_common::config::ServiceConfig;
use mcat_common::db::users;
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const SECRET: &str = "auth-test-secret";

/// Test helper: router and state over a fresh root folder with a fixed secret
async fn setup_app() -> (TempDir, AppState, Router) {
    let dir = TempDir::new().unwrap();
    let config = ServiceConfig {
        token_secret: Some(SECRET.to_string()),
        ..ServiceConfig::default()
    };
    let state = AppState::initialize(dir.path(), config)
        .await
        .expect("Should initialize state");
    let app = build_router(state.clone());
    (dir, state, app)
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

async fn signup_alice(app: &Router) {
    let (status, _) = send(
        app,
        form_request(
            "/signup",
            "username=alice&email=alice%40example.com&password=s3cret%21&full_name=Alice+Liddell",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn login_alice(app: &Router) -> String {
    let (status, body) = send(app, form_request("/token", "username=alice&password=s3cret%21")).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

// =============================================================================
// Signup
// =============================================================================

#[tokio::test]
async fn test_signup_returns_public_user() {
    let (_dir, _state, app) = setup_app().await;

    let (status, body) = send(
        &app,
        form_request(
            "/signup",
            "username=alice&email=alice%40example.com&password=s3cret%21&full_name=Alice+Liddell",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["full_name"], "Alice Liddell");
    assert_eq!(body["disabled"], false);
    assert!(body.get("hashed_password").is_none());
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_signup_alias_route() {
    let (_dir, _state, app) = setup_app().await;

    let (status, body) = send(
        &app,
        form_request("/auth/signup", "username=bob&email=bob%40example.com&password=pw"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], Value::Null);
}

#[tokio::test]
async fn test_duplicate_signup_rejected() {
    let (_dir, state, app) = setup_app().await;
    signup_alice(&app).await;

    let (status, body) = send(
        &app,
        form_request("/signup", "username=alice&email=new%40example.com&password=x"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(body["error"]["message"], "Username already registered");

    let (status, body) = send(
        &app,
        form_request("/signup", "username=alice2&email=alice%40example.com&password=x"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Email already registered");

    assert_eq!(users::count_users(&state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_signup_missing_password_rejected() {
    let (_dir, _state, app) = setup_app().await;

    let (status, body) = send(
        &app,
        form_request("/signup", "username=carol&email=carol%40example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// Token login
// =============================================================================

#[tokio::test]
async fn test_token_login_issues_bearer_token() {
    let (_dir, _state, app) = setup_app().await;
    signup_alice(&app).await;

    let (status, body) = send(&app, form_request("/token", "username=alice&password=s3cret%21")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");

    let token = body["access_token"].as_str().unwrap();
    let claims = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(SECRET.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap()
    .claims;
    assert_eq!(claims.sub.as_deref(), Some("alice"));
    assert!(claims.exp > chrono::Utc::now().timestamp());
}

#[tokio::test]
async fn test_signin_alias_accepts_email() {
    let (_dir, _state, app) = setup_app().await;
    signup_alice(&app).await;

    let (status, body) = send(
        &app,
        form_request("/auth/signin", "username=alice%40example.com&password=s3cret%21"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
}

#[tokio::test]
async fn test_wrong_password_unauthorized() {
    let (_dir, _state, app) = setup_app().await;
    signup_alice(&app).await;

    let response = app
        .clone()
        .oneshot(form_request("/token", "username=alice&password=wrong"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["message"], "Incorrect username or password");
}

// =============================================================================
// Protected routes
// =============================================================================

#[tokio::test]
async fn test_protected_route_with_header_token() {
    let (_dir, _state, app) = setup_app().await;
    signup_alice(&app).await;
    let token = login_alice(&app).await;

    let (status, body) = send(&app, get_request("/protected", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Hello alice, you accessed a protected route!");
}

#[tokio::test]
async fn test_protected_route_with_query_token() {
    let (_dir, _state, app) = setup_app().await;
    signup_alice(&app).await;
    let token = login_alice(&app).await;

    let (status, body) = send(&app, get_request(&format!("/protected?token={}", token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Hello alice, you accessed a protected route!");
}

#[tokio::test]
async fn test_protected_route_rejects_missing_or_bad_token() {
    let (_dir, _state, app) = setup_app().await;

    let (status, body) = send(&app, get_request("/protected", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, get_request("/protected", Some("not.a.jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_users_me_returns_profile() {
    let (_dir, _state, app) = setup_app().await;
    signup_alice(&app).await;
    let token = login_alice(&app).await;

    let (status, body) = send(&app, get_request("/users/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("hashed_password").is_none());
}

#[tokio::test]
async fn test_disabled_user_rejected_with_valid_token() {
    let (_dir, state, app) = setup_app().await;
    signup_alice(&app).await;
    let token = login_alice(&app).await;

    assert!(users::set_disabled(&state.db, "alice", true).await.unwrap());

    let (status, body) = send(&app, get_request("/protected", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Inactive user");
}

#[tokio::test]
async fn test_protected_catalog_accepts_token() {
    let dir = TempDir::new().unwrap();
    let config = ServiceConfig {
        token_secret: Some(SECRET.to_string()),
        protect_catalog: true,
        ..ServiceConfig::default()
    };
    let state = AppState::initialize(dir.path(), config).await.unwrap();
    let app = build_router(state);
    signup_alice(&app).await;
    let token = login_alice(&app).await;

    let (status, body) = send(&app, get_request("/api/artists/all", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(vec![]));
}
