//! Profile endpoints of the authenticated principal.
//!
//! - GET `/api/me` - Any role
//! - GET `/api/users/me` - Authors and reviewers
//! - GET `/api/chairs/me` - Chairs

use axum::{Json, Router, routing::get};

use super::AuthState;
use crate::auth::{AnyRoleAuth, ChairAuth, Principal, UserAuth};

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/users/me", get(user_me))
        .route("/chairs/me", get(chair_me))
        .with_state(state)
}

async fn me(AnyRoleAuth(principal): AnyRoleAuth) -> Json<Principal> {
    Json(principal)
}

async fn user_me(UserAuth(principal): UserAuth) -> Json<Principal> {
    Json(principal)
}

async fn chair_me(ChairAuth(principal): ChairAuth) -> Json<Principal> {
    Json(principal)
}
