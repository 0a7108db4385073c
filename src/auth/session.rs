//! Session lifecycle: issuance on login, rotation on refresh, termination
//! on logout.
//!
//! Exactly one refresh token is live per principal email. Rotation replaces
//! it on every refresh; presenting a token that was already rotated away
//! revokes the session outright.

use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

use super::cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, SessionCookies, auth_cookie};
use super::errors::AuthErrorKind;
use crate::db::{Database, normalize_email};
use crate::jwt::{JwtConfig, JwtError, hash_token};

/// Errors from issuing a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Token(#[from] JwtError),
    #[error("failed to store refresh token: {0}")]
    Store(#[from] sqlx::Error),
}

/// Mint a token pair for a confirmed identity and persist the refresh hash.
///
/// The caller must have verified the identity already. The email is
/// normalised before it is signed or stored. Cookies are only returned once
/// the store write succeeded.
pub async fn issue_session(
    db: &Database,
    jwt: &JwtConfig,
    email: &str,
    id: i64,
    secure: bool,
) -> Result<SessionCookies, SessionError> {
    let email = normalize_email(email);
    let access = jwt.issue_access_token(&email, id)?;
    let refresh = jwt.issue_refresh_token(&email, id)?;

    db.refresh_tokens()
        .upsert(&email, &hash_token(&refresh.token), refresh.duration)
        .await?;

    Ok(SessionCookies {
        access: auth_cookie(ACCESS_COOKIE_NAME, &access.token, access.duration, secure),
        refresh: auth_cookie(REFRESH_COOKIE_NAME, &refresh.token, refresh.duration, secure),
    })
}

/// Exchange a refresh token for a new token pair.
///
/// Every failure maps to one `AuthErrorKind`; the caller clears cookies.
pub async fn refresh_session(
    db: &Database,
    jwt: &JwtConfig,
    presented: Option<&str>,
    secure: bool,
) -> Result<SessionCookies, AuthErrorKind> {
    let token = presented.ok_or(AuthErrorKind::MissingToken)?;

    let claims = jwt.verify_refresh_token(token)?;

    let stored = db
        .refresh_tokens()
        .lookup_valid(&claims.email)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to look up refresh token");
            AuthErrorKind::Backend
        })?
        // Absent and expired records look the same as a bad token
        .ok_or(AuthErrorKind::TokenInvalid)?;

    let presented_hash = hash_token(token);
    if !bool::from(stored.as_bytes().ct_eq(presented_hash.as_bytes())) {
        warn!(email = %claims.email, "Refresh token reuse detected, revoking session");
        db.refresh_tokens()
            .delete(&claims.email)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to revoke session after token mismatch");
                AuthErrorKind::Backend
            })?;
        return Err(AuthErrorKind::TokenMismatch);
    }

    issue_session(db, jwt, &claims.email, claims.id, secure)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to rotate session");
            AuthErrorKind::Backend
        })
}

/// Drop the stored session of whoever the presented tokens belong to.
///
/// The refresh token is preferred; the access token is used when the refresh
/// token is missing or unreadable. Returns whether a record was deleted.
pub async fn end_session(
    db: &Database,
    jwt: &JwtConfig,
    refresh: Option<&str>,
    access: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let email = refresh
        .and_then(|t| jwt.verify_refresh_token(t).ok())
        .or_else(|| access.and_then(|t| jwt.verify_access_token(t).ok()))
        .map(|claims| claims.email);

    let Some(email) = email else {
        return Ok(false);
    };

    let deleted = db.refresh_tokens().delete(&email).await?;
    if deleted {
        info!(email = %email, "Session ended");
    }
    Ok(deleted)
}
