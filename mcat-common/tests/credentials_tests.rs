//! Tests for signup, login and token validation

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mcat_common::auth::{load_token_secret, CredentialService, NewAccount, TokenClaims, TokenKeys};
use mcat_common::db::init::init_database;
use mcat_common::db::users;
use mcat_common::Error;
use sqlx::SqlitePool;
use tempfile::TempDir;

const SECRET: &[u8] = b"credentials-test-secret";

async fn setup() -> (TempDir, SqlitePool, CredentialService) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("mcat.db")).await.unwrap();
    let service = CredentialService::new(pool.clone(), TokenKeys::from_secret(SECRET, 60 * 24 * 7));
    (dir, pool, service)
}

fn account(username: &str, email: &str) -> NewAccount {
    NewAccount {
        username: username.to_string(),
        email: email.to_string(),
        password: "s3cret!".to_string(),
        full_name: Some("Test User".to_string()),
    }
}

#[tokio::test]
async fn test_signup_stores_hash_not_password() {
    let (_dir, pool, service) = setup().await;

    let user = service.signup(account("alice", "alice@example.com")).await.unwrap();
    assert_eq!(user.username, "alice");
    assert!(!user.disabled);

    let stored: String = sqlx::query_scalar("SELECT hashed_password FROM users WHERE username = 'alice'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_ne!(stored, "s3cret!");
    assert!(stored.starts_with("$argon2"));
}

#[tokio::test]
async fn test_duplicate_username_or_email_conflicts() {
    let (_dir, pool, service) = setup().await;
    service.signup(account("alice", "alice@example.com")).await.unwrap();

    let same_name = service.signup(account("alice", "other@example.com")).await;
    assert!(matches!(same_name, Err(Error::Conflict(_))));

    let same_email = service.signup(account("bob", "alice@example.com")).await;
    assert!(matches!(same_email, Err(Error::Conflict(_))));

    assert_eq!(users::count_users(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_blank_fields_rejected() {
    let (_dir, _pool, service) = setup().await;
    let mut blank = account("  ", "x@example.com");
    assert!(matches!(service.signup(blank.clone()).await, Err(Error::InvalidInput(_))));

    blank.username = "carol".to_string();
    blank.password = String::new();
    assert!(matches!(service.signup(blank).await, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn test_login_issues_token_for_subject() {
    let (_dir, _pool, service) = setup().await;
    service.signup(account("alice", "alice@example.com")).await.unwrap();

    let (user, token) = service.login("alice", "s3cret!").await.unwrap();
    assert_eq!(user.username, "alice");

    let decoded = decode::<TokenClaims>(
        &token.access_token,
        &DecodingKey::from_secret(SECRET),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap();
    assert_eq!(decoded.claims.sub.as_deref(), Some("alice"));
    assert!(decoded.claims.exp > Utc::now().timestamp());
    // Default lifetime is one week
    assert!(decoded.claims.exp > Utc::now().timestamp() + 6 * 24 * 3600);
}

#[tokio::test]
async fn test_login_by_email() {
    let (_dir, _pool, service) = setup().await;
    service.signup(account("alice", "alice@example.com")).await.unwrap();

    let (user, _) = service.login("alice@example.com", "s3cret!").await.unwrap();
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_unauthorized() {
    let (_dir, _pool, service) = setup().await;
    service.signup(account("alice", "alice@example.com")).await.unwrap();

    assert!(matches!(
        service.login("alice", "wrong").await,
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
        service.login("nobody", "s3cret!").await,
        Err(Error::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_validate_token() {
    let (_dir, _pool, service) = setup().await;
    service.signup(account("alice", "alice@example.com")).await.unwrap();
    let (_, token) = service.login("alice", "s3cret!").await.unwrap();

    let user = service.validate(&token.access_token).await.unwrap();
    assert_eq!(user.email, "alice@example.com");

    assert!(matches!(
        service.validate("garbage").await,
        Err(Error::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_disabled_account_rejected_with_valid_token() {
    let (_dir, pool, service) = setup().await;
    service.signup(account("alice", "alice@example.com")).await.unwrap();
    let (_, token) = service.login("alice", "s3cret!").await.unwrap();

    assert!(users::set_disabled(&pool, "alice", true).await.unwrap());

    assert!(matches!(
        service.validate(&token.access_token).await,
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
        service.login("alice", "s3cret!").await,
        Err(Error::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_set_disabled_toggles_login() {
    let (_dir, _pool, service) = setup().await;
    service.signup(account("alice", "alice@example.com")).await.unwrap();

    service.set_disabled("alice", true).await.unwrap();
    assert!(matches!(
        service.login("alice", "s3cret!").await,
        Err(Error::Unauthorized(_))
    ));

    service.set_disabled("alice", false).await.unwrap();
    assert!(service.login("alice", "s3cret!").await.is_ok());

    assert!(matches!(
        service.set_disabled("nobody", true).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_token_for_deleted_user_rejected() {
    let (_dir, pool, service) = setup().await;
    let token = service.keys().issue("ghost").unwrap();
    assert_eq!(users::count_users(&pool).await.unwrap(), 0);

    assert!(matches!(
        service.validate(&token.access_token).await,
        Err(Error::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_token_secret_generated_once() {
    let (_dir, pool, _service) = setup().await;

    let first = load_token_secret(&pool).await.unwrap();
    let second = load_token_secret(&pool).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 64);
}
