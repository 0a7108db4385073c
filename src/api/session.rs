//! Session API endpoints.
//!
//! - POST `/refresh` - Rotate the token pair using the refresh token cookie
//! - POST `/logout` - Drop the stored session and clear cookies
//! - GET `/verify` - Check whether the access token is still usable

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use tracing::error;

use super::AuthState;
use crate::auth::{
    ACCESS_COOKIE_NAME, AnyRoleAuth, ApiAuthError, REFRESH_COOKIE_NAME, clear_cookie,
    end_session, get_cookie, refresh_session,
};

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/verify", get(verify_session))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
}

/// Lightweight auth status check (e.g. on page restore).
/// Returns 200 if the access token resolves to a principal.
async fn verify_session(AnyRoleAuth(_principal): AnyRoleAuth) -> impl IntoResponse {
    StatusCode::OK
}

/// Exchange the refresh token for a new token pair.
/// Any failure clears both cookies.
async fn refresh(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiAuthError> {
    let presented = get_cookie(&headers, REFRESH_COOKIE_NAME);

    let cookies = refresh_session(&state.db, &state.jwt, presented, state.secure_cookies)
        .await
        .map_err(|kind| ApiAuthError::clearing_cookies(kind, state.secure_cookies))?;

    Ok((
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, cookies.access), (SET_COOKIE, cookies.refresh)]),
        Json(serde_json::json!({ "success": true })),
    ))
}

/// Logout always succeeds and clears both cookies.
async fn logout(State(state): State<AuthState>, headers: HeaderMap) -> impl IntoResponse {
    let refresh = get_cookie(&headers, REFRESH_COOKIE_NAME);
    let access = get_cookie(&headers, ACCESS_COOKIE_NAME);

    if let Err(e) = end_session(&state.db, &state.jwt, refresh, access).await {
        error!(error = %e, "Failed to delete refresh token on logout");
    }

    let secure = state.secure_cookies;
    (
        StatusCode::OK,
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, secure)),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, secure)),
        ]),
        Json(serde_json::json!({ "success": true })),
    )
}
