mod error;
mod me;
pub mod oauth;
mod session;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

pub use error::ApiError;

/// State shared by the cookie-authenticated API endpoints.
#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_backend!(AuthState);

/// Create the API router.
pub fn create_api_router(db: Database, jwt: Arc<JwtConfig>, secure_cookies: bool) -> Router {
    let state = AuthState {
        db,
        jwt,
        secure_cookies,
    };

    Router::new()
        .nest("/session", session::router(state.clone()))
        .merge(me::router(state))
}
