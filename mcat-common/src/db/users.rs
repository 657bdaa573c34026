//! Queries on the `users` table

use crate::db::models::User;
use crate::Result;
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, username, email, full_name, hashed_password, disabled";

/// Look up an account by username
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Look up an account by username or email
pub async fn find_by_identity(pool: &SqlitePool, identity: &str) -> Result<Option<User>> {
    let sql = format!(
        "SELECT {} FROM users WHERE username = ?1 OR email = ?1 ORDER BY username = ?1 DESC LIMIT 1",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(identity)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Which of username/email are already registered
pub async fn identity_taken(
    pool: &SqlitePool,
    username: &str,
    email: &str,
) -> Result<(bool, bool)> {
    let (username_taken, email_taken): (bool, bool) = sqlx::query_as(
        "SELECT
            EXISTS(SELECT 1 FROM users WHERE username = ?),
            EXISTS(SELECT 1 FROM users WHERE email = ?)",
    )
    .bind(username)
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok((username_taken, email_taken))
}

/// Insert a new account and return the stored row
pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    full_name: Option<&str>,
    hashed_password: &str,
) -> Result<User> {
    let id = sqlx::query(
        "INSERT INTO users (username, email, full_name, hashed_password, disabled)
         VALUES (?, ?, ?, ?, 0)",
    )
    .bind(username)
    .bind(email)
    .bind(full_name)
    .bind(hashed_password)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        full_name: full_name.map(str::to_string),
        hashed_password: hashed_password.to_string(),
        disabled: false,
    })
}

/// Enable or disable an account; returns false when the username is unknown
pub async fn set_disabled(pool: &SqlitePool, username: &str, disabled: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET disabled = ? WHERE username = ?")
        .bind(disabled)
        .bind(username)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Number of registered accounts
pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
