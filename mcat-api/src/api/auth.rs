//! Account endpoints and bearer-token middleware
//!
//! Tokens are read from `Authorization: Bearer <token>`, falling back to a
//! `token` query parameter for clients that cannot set headers (audio tags,
//! plain links). The middleware loads the user and places it in the request
//! extensions for downstream handlers.

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Form, Json,
};
use mcat_common::auth::NewAccount;
use mcat_common::db::{PublicUser, User};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Signup form (urlencoded)
///
/// Fields default to empty so that a missing field gets the same
/// validation error as a blank one.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Login form (urlencoded); `username` may also be an email address
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> ApiResult<(StatusCode, Json<PublicUser>)> {
    let user = state
        .credentials
        .signup(NewAccount {
            username: form.username,
            email: form.email,
            password: form.password,
            full_name: form.full_name.filter(|name| !name.trim().is_empty()),
        })
        .await?;

    Ok((StatusCode::OK, Json(PublicUser::from(user))))
}

/// POST /token
pub async fn issue_token(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<TokenResponse>> {
    let (_user, token) = state
        .credentials
        .login(form.username.trim(), &form.password)
        .await?;

    Ok(Json(TokenResponse {
        access_token: token.access_token,
        token_type: "bearer".to_string(),
    }))
}

/// GET /protected
pub async fn protected(Extension(user): Extension<User>) -> Json<Value> {
    Json(json!({
        "message": format!("Hello {}, you accessed a protected route!", user.username),
    }))
}

/// GET /users/me
pub async fn current_user(Extension(user): Extension<User>) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

/// Bearer-token middleware
///
/// Rejects the request with 401 unless it carries a valid token for an
/// existing, enabled account.
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = bearer_token(request.headers())
        .or_else(|| query_token(&request))
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    let user = state.credentials.validate(&token).await?;
    debug!("Authenticated request for {}", user.username);

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

fn query_token(request: &Request) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(request.uri()).ok()?;
    params.get("token").filter(|t| !t.is_empty()).cloned()
}
