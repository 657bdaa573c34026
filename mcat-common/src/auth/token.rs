//! Signed bearer tokens (HS256 JWT)
//!
//! Claims carry the username as `sub` and an `exp` Unix timestamp. The
//! signing secret comes from configuration or, when unset, from the
//! `settings` table, where a random one is generated on first start.

use crate::db::settings::{get_setting, set_setting};
use crate::{Error, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Settings key holding the generated signing secret
pub const TOKEN_SECRET_SETTING: &str = "token_signing_secret";

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (username); optional so a token without it decodes and is then rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

/// A freshly issued token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: i64,
}

/// Keys for signing and verifying tokens
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenKeys {
    pub fn from_secret(secret: &[u8], lifetime_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime: Duration::try_minutes(lifetime_minutes).unwrap_or(Duration::MAX),
        }
    }

    /// Sign a token for `subject`, expiring after the configured lifetime
    pub fn issue(&self, subject: &str) -> Result<IssuedToken> {
        let expires_at = Utc::now()
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| Error::Internal("Token lifetime out of range".to_string()))?
            .timestamp();
        let claims = TokenClaims {
            sub: Some(subject.to_string()),
            exp: expires_at,
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("Token signing failed: {}", e)))?;

        Ok(IssuedToken {
            access_token,
            expires_at,
        })
    }

    /// Verify signature and expiry, returning the subject
    pub fn verify(&self, token: &str) -> Result<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<TokenClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Error::Unauthorized("Token has expired".to_string())
                }
                _ => Error::Unauthorized("Invalid token".to_string()),
            }
        })?;

        match data.claims.sub {
            Some(sub) if !sub.is_empty() => Ok(sub),
            _ => Err(Error::Unauthorized("Invalid token".to_string())),
        }
    }
}

/// Load the signing secret from settings, generating and storing one if missing
pub async fn load_token_secret(pool: &SqlitePool) -> Result<String> {
    if let Some(secret) = get_setting(pool, TOKEN_SECRET_SETTING).await? {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }
    initialize_token_secret(pool).await
}

/// Generate a random 256-bit secret and store it in settings
pub async fn initialize_token_secret(pool: &SqlitePool) -> Result<String> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let secret: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

    set_setting(pool, TOKEN_SECRET_SETTING, &secret).await?;
    Ok(secret)
}
