use axum::{
    extract::{Request, State},
    http::{header::COOKIE, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::Settings;
use crate::error::AppError;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
const ACCESS_TOKEN_TYPE: &str = "access";

/// Checks the admin cookie on every request of the protected routers. The
/// verified identity is inserted into the request as `AdminIdentity`.
pub async fn admin_auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = cookie_value(req.headers(), ACCESS_TOKEN_COOKIE).ok_or(AppError::NotAuthenticated)?;

    let admin = &state.settings.admin;
    let claims = validate_token(&token, &admin.jwt_secret_key)?;
    let subject = claims.sub.unwrap_or_default();

    if normalize_email(&subject) != normalize_email(&admin.email) {
        tracing::warn!(subject = %subject, "Token subject is not the admin");
        return Err(AppError::NotAuthorized);
    }

    req.extensions_mut().insert(AdminIdentity { email: subject });
    Ok(next.run(req).await)
}

#[derive(Clone, Debug)]
pub struct AuthState {
    pub settings: Arc<Settings>,
}

#[derive(Clone, Debug)]
pub struct AdminIdentity {
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(rename = "type")]
    pub token_type: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Invalid token type")]
    WrongType,
    #[error("Token subject missing")]
    MissingSubject,
    #[error("Failed to generate token")]
    Generation,
}

impl TokenError {
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Expired => "expired",
            TokenError::Invalid => "invalid",
            TokenError::WrongType => "wrong_type",
            TokenError::MissingSubject => "missing_subject",
            TokenError::Generation => "generation_failed",
        }
    }
}

pub fn generate_token(
    subject: &str,
    secret: &str,
    expires_minutes: i64,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let exp = Duration::try_minutes(expires_minutes)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or(TokenError::Generation)?;

    let claims = Claims {
        sub: Some(subject.to_string()),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        token_type: Some(ACCESS_TOKEN_TYPE.to_string()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| TokenError::Generation)
}

/// Fails closed on expiry (no leeway), bad signature, wrong type or a
/// missing subject.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?
    .claims;

    if claims.token_type.as_deref() != Some(ACCESS_TOKEN_TYPE) {
        return Err(TokenError::WrongType);
    }
    if claims.sub.as_deref().map_or(true, |s| s.trim().is_empty()) {
        return Err(TokenError::MissingSubject);
    }
    Ok(claims)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Value of the first cookie called `name` across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn access_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{ACCESS_TOKEN_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_access_cookie(secure: bool) -> String {
    access_cookie("", 0, secure)
}
