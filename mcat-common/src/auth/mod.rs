//! Credential and token handling
//!
//! Contains ONLY framework-independent logic: password hashing, token
//! signing and the account queries built on them. The HTTP service wraps
//! these in its own extractors and middleware.

pub mod credentials;
pub mod password;
pub mod token;

pub use credentials::{CredentialService, NewAccount};
pub use token::{load_token_secret, IssuedToken, TokenClaims, TokenKeys};
