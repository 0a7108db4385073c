//! Axum extractors for authentication.
//!
//! Each extractor verifies the access token cookie and materializes the
//! principal from its identity store(s). Expired or invalid access tokens
//! are rejected without clearing cookies so the client can refresh and
//! retry; a principal that no longer exists clears the session.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, error};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::{IdentityStore, Principal};

/// Core authentication logic shared by all extractors.
async fn authenticate_request<S>(
    parts: &Parts,
    state: &S,
    stores: &[IdentityStore],
) -> Result<Principal, ApiAuthError>
where
    S: HasAuthBackend + Send + Sync,
{
    let secure = state.secure_cookies();

    let access_token = get_cookie(&parts.headers, ACCESS_COOKIE_NAME)
        .ok_or(ApiAuthError::keep_cookies(AuthErrorKind::MissingToken))?;

    let claims = state
        .jwt()
        .verify_access_token(access_token)
        .map_err(|rejection| ApiAuthError::keep_cookies(rejection.into()))?;

    let principal = IdentityStore::resolve(stores, state.db(), &claims)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to look up principal");
            ApiAuthError::clearing_cookies(AuthErrorKind::Backend, secure)
        })?
        .ok_or_else(|| {
            debug!(email = %claims.email, "Token principal no longer exists");
            ApiAuthError::clearing_cookies(AuthErrorKind::PrincipalNotFound, secure)
        })?;

    Ok(principal)
}

/// Extractor for endpoints served to authors and reviewers.
pub struct UserAuth(pub Principal);

impl<S> FromRequestParts<S> for UserAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state, &[IdentityStore::Users])
            .await
            .map(UserAuth)
    }
}

/// Extractor for chair-only endpoints.
pub struct ChairAuth(pub Principal);

impl<S> FromRequestParts<S> for ChairAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state, &[IdentityStore::Chairs])
            .await
            .map(ChairAuth)
    }
}

/// Extractor for endpoints shared across roles: resolves against the user
/// store first, then the chair store.
pub struct AnyRoleAuth(pub Principal);

impl<S> FromRequestParts<S> for AnyRoleAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state, &[IdentityStore::Users, IdentityStore::Chairs])
            .await
            .map(AnyRoleAuth)
    }
}
