//! OAuth login endpoints, mounted under `/auth`.
//!
//! - GET `/{role}/start` - Redirect to the identity provider
//! - GET `/{role}/callback` - Finish the login and issue a session

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse, Redirect},
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

use super::error::ApiError;
use crate::auth::{get_cookie, issue_session};
use crate::db::Database;
use crate::identity::IdentityProvider;
use crate::jwt::JwtConfig;
use crate::oauth::{ProfileExchange, generate_state};
use crate::rate_limit::{RateLimitConfig, rate_limit_oauth_callback, rate_limit_oauth_start};

/// Cookie binding the callback to the browser that started the login.
pub const OAUTH_STATE_COOKIE_NAME: &str = "oauthState";

const OAUTH_STATE_MAX_AGE_SECS: u64 = 600;

#[derive(Clone)]
pub struct OAuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
    pub exchange: Arc<dyn ProfileExchange>,
    /// Base for the callback URLs registered with the provider
    pub public_origin: Url,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: OAuthState) -> Router {
    let start_router = Router::new()
        .route("/{provider}/start", get(start))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_oauth_start,
        ));

    let callback_router = Router::new()
        .route("/{provider}/callback", get(callback))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config,
            rate_limit_oauth_callback,
        ));

    Router::new().merge(start_router).merge(callback_router)
}

/// The provider redirects back cross-site, so the state cookie is `Lax`.
fn state_cookie(value: &str, max_age_secs: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/auth; Max-Age={}{}",
        OAUTH_STATE_COOKIE_NAME, value, max_age_secs, secure
    )
}

fn redirect_uri(state: &OAuthState, provider: IdentityProvider) -> Result<String, ApiError> {
    state
        .public_origin
        .join(&format!("auth/{}/callback", provider.slug()))
        .map(String::from)
        .map_err(|e| {
            error!(error = %e, "Failed to build OAuth redirect URI");
            ApiError::internal("Invalid server origin")
        })
}

async fn start(
    State(state): State<OAuthState>,
    Path(provider): Path<IdentityProvider>,
) -> Result<impl IntoResponse, ApiError> {
    let redirect_uri = redirect_uri(&state, provider)?;
    let oauth_state = generate_state();

    let authorize_url = state.exchange.authorize_url(&oauth_state, &redirect_uri)?;

    Ok((
        AppendHeaders([(
            SET_COOKIE,
            state_cookie(&oauth_state, OAUTH_STATE_MAX_AGE_SECS, state.secure_cookies),
        )]),
        Redirect::to(authorize_url.as_str()),
    ))
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

async fn callback(
    State(state): State<OAuthState>,
    Path(provider): Path<IdentityProvider>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let expected = get_cookie(&headers, OAUTH_STATE_COOKIE_NAME)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing OAuth state"))?;

    if params.state.as_deref() != Some(expected) {
        return Err(ApiError::bad_request("OAuth state mismatch"));
    }

    let code = params
        .code
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

    let redirect_uri = redirect_uri(&state, provider)?;
    let profile = state.exchange.exchange(&code, &redirect_uri).await?;

    let principal = provider.resolve(&state.db, &profile).await?;

    let cookies = issue_session(
        &state.db,
        &state.jwt,
        &principal.email,
        principal.id,
        state.secure_cookies,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to issue session");
        ApiError::internal("Failed to create session")
    })?;

    info!(
        email = %principal.email,
        role = principal.role.as_str(),
        "Logged in via OAuth"
    );

    Ok((
        AppendHeaders([
            (SET_COOKIE, cookies.access),
            (SET_COOKIE, cookies.refresh),
            (SET_COOKIE, state_cookie("", 0, state.secure_cookies)),
        ]),
        Redirect::to("/"),
    ))
}
