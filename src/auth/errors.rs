//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::cookie::append_cleared_session;
use crate::jwt::TokenRejection;

/// Failure categories of the token/session subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No token cookie was presented
    MissingToken,
    /// Token signature is fine but it has expired
    TokenExpired,
    /// Token is malformed, badly signed, or has no live session behind it
    TokenInvalid,
    /// A refresh token that no longer matches the stored one was replayed
    TokenMismatch,
    /// Token is valid but its principal no longer exists
    PrincipalNotFound,
    /// Storage or signing failure
    Backend,
}

impl AuthErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthErrorKind::MissingToken
            | AuthErrorKind::TokenExpired
            | AuthErrorKind::TokenInvalid
            | AuthErrorKind::TokenMismatch
            | AuthErrorKind::PrincipalNotFound => StatusCode::UNAUTHORIZED,
            AuthErrorKind::Backend => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable reason code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AuthErrorKind::MissingToken => "no_token",
            AuthErrorKind::TokenExpired => "token_expired",
            AuthErrorKind::TokenInvalid => "token_invalid",
            AuthErrorKind::TokenMismatch => "token_mismatch",
            AuthErrorKind::PrincipalNotFound => "principal_not_found",
            AuthErrorKind::Backend => "server_error",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthErrorKind::MissingToken => "Not authenticated",
            AuthErrorKind::TokenExpired => "Token has expired",
            AuthErrorKind::TokenInvalid => "Invalid token",
            AuthErrorKind::TokenMismatch => "Token mismatch, session revoked",
            AuthErrorKind::PrincipalNotFound => "Account not found",
            AuthErrorKind::Backend => "Internal error",
        }
    }
}

impl From<TokenRejection> for AuthErrorKind {
    fn from(rejection: TokenRejection) -> Self {
        match rejection {
            TokenRejection::Expired => AuthErrorKind::TokenExpired,
            TokenRejection::Malformed => AuthErrorKind::TokenInvalid,
        }
    }
}

/// API authentication error (JSON body, optionally clears both auth cookies).
#[derive(Debug)]
pub struct ApiAuthError {
    pub kind: AuthErrorKind,
    /// `Some(secure)` when the response must clear the session cookies.
    clear_cookies: Option<bool>,
}

impl ApiAuthError {
    /// Reject without touching the client's cookies.
    pub fn keep_cookies(kind: AuthErrorKind) -> Self {
        Self {
            kind,
            clear_cookies: None,
        }
    }

    /// Reject and clear both session cookies.
    pub fn clearing_cookies(kind: AuthErrorKind, secure: bool) -> Self {
        Self {
            kind,
            clear_cookies: Some(secure),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    code: &'static str,
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        let mut response = (
            self.kind.status_code(),
            Json(ErrorResponse {
                error: self.kind.message(),
                code: self.kind.code(),
            }),
        )
            .into_response();

        if let Some(secure) = self.clear_cookies {
            append_cleared_session(response.headers_mut(), secure);
        }

        response
    }
}
