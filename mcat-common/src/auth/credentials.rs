//! Account registration, login and token validation

use super::password::{hash_password, verify_password};
use super::token::{IssuedToken, TokenKeys};
use crate::db::models::User;
use crate::db::users;
use crate::{Error, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

/// Signup input
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// Credential service: the only code that touches password hashes
#[derive(Clone)]
pub struct CredentialService {
    pool: SqlitePool,
    keys: Arc<TokenKeys>,
}

impl CredentialService {
    pub fn new(pool: SqlitePool, keys: TokenKeys) -> Self {
        Self {
            pool,
            keys: Arc::new(keys),
        }
    }

    /// Register an account
    ///
    /// Fails with `Conflict` if the username or email is already registered,
    /// including when a concurrent signup wins the race to the insert.
    pub async fn signup(&self, account: NewAccount) -> Result<User> {
        let username = account.username.trim().to_string();
        let email = account.email.trim().to_string();
        if username.is_empty() || email.is_empty() || account.password.is_empty() {
            return Err(Error::InvalidInput(
                "username, email and password are required".to_string(),
            ));
        }
        let full_name = account
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let (username_taken, email_taken) =
            users::identity_taken(&self.pool, &username, &email).await?;
        if username_taken {
            return Err(Error::Conflict("Username already registered".to_string()));
        }
        if email_taken {
            return Err(Error::Conflict("Email already registered".to_string()));
        }

        let password = account.password;
        let hashed = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| Error::Internal(format!("Hashing task failed: {}", e)))??;

        let user = users::insert_user(&self.pool, &username, &email, full_name.as_deref(), &hashed)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    Error::Conflict("Username or email already registered".to_string())
                } else {
                    e
                }
            })?;

        info!("Registered user {}", user.username);
        Ok(user)
    }

    /// Verify an identity (username or email) and password
    ///
    /// Unknown identity, wrong password and disabled account all fail with
    /// `Unauthorized`.
    pub async fn authenticate(&self, identity: &str, password: &str) -> Result<User> {
        let rejected = || Error::Unauthorized("Incorrect username or password".to_string());

        let user = users::find_by_identity(&self.pool, identity.trim())
            .await?
            .ok_or_else(rejected)?;

        let stored = user.hashed_password.clone();
        let attempt = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&attempt, &stored))
            .await
            .map_err(|e| Error::Internal(format!("Verification task failed: {}", e)))?;
        if !matches {
            warn!("Failed login for {}", user.username);
            return Err(rejected());
        }

        if user.disabled {
            return Err(Error::Unauthorized("Inactive user".to_string()));
        }

        Ok(user)
    }

    /// Authenticate and issue a bearer token for the account
    pub async fn login(&self, identity: &str, password: &str) -> Result<(User, IssuedToken)> {
        let user = self.authenticate(identity, password).await?;
        let token = self.keys.issue(&user.username)?;
        info!("Issued token for {}", user.username);
        Ok((user, token))
    }

    /// Resolve a bearer token to its account
    ///
    /// Fails with `Unauthorized` for a bad signature, an expired token, a
    /// missing subject, an unknown user or a disabled account.
    pub async fn validate(&self, token: &str) -> Result<User> {
        let username = self.keys.verify(token)?;

        let user = users::find_by_username(&self.pool, &username)
            .await?
            .ok_or_else(|| Error::Unauthorized("Invalid token".to_string()))?;

        if user.disabled {
            return Err(Error::Unauthorized("Inactive user".to_string()));
        }

        Ok(user)
    }

    /// Enable or disable an account; `NotFound` for an unknown username
    pub async fn set_disabled(&self, username: &str, disabled: bool) -> Result<()> {
        if !users::set_disabled(&self.pool, username, disabled).await? {
            return Err(Error::NotFound(format!("User '{}' not found", username)));
        }
        info!(
            "{} account {}",
            if disabled { "Disabled" } else { "Enabled" },
            username
        );
        Ok(())
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }
}
