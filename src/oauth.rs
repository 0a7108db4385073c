//! OAuth 2.0 authorization-code exchange with an external identity provider.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::identity::ExternalProfile;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const GOOGLE_SCOPE: &str = "openid email profile";

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("invalid provider URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider rejected the authorization code: {0}")]
    Rejected(String),
}

/// Seam between the login routes and the identity provider.
#[async_trait]
pub trait ProfileExchange: Send + Sync {
    /// URL the browser is sent to in order to log in.
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<Url, OAuthError>;

    /// Trade an authorization code for the logged-in user's profile.
    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<ExternalProfile, OAuthError>;
}

/// Random value binding a callback to the browser that started the login.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Google as an OpenID Connect provider.
pub struct GoogleOAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    authorize_url: String,
    token_url: String,
    userinfo_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    email: String,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
}

impl GoogleOAuth {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_endpoints(
            client_id,
            client_secret,
            GOOGLE_AUTHORIZE_URL,
            GOOGLE_TOKEN_URL,
            GOOGLE_USERINFO_URL,
        )
    }

    /// Point the client at other endpoints, e.g. a local mock provider.
    pub fn with_endpoints(
        client_id: String,
        client_secret: String,
        authorize_url: &str,
        token_url: &str,
        userinfo_url: &str,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
            authorize_url: authorize_url.to_string(),
            token_url: token_url.to_string(),
            userinfo_url: userinfo_url.to_string(),
        }
    }
}

#[async_trait]
impl ProfileExchange for GoogleOAuth {
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&self.authorize_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", GOOGLE_SCOPE)
            .append_pair("state", state)
            .append_pair("prompt", "select_account");
        Ok(url)
    }

    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<ExternalProfile, OAuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, body = %body, "Token endpoint rejected code");
            return Err(OAuthError::Rejected(status.to_string()));
        }

        let token: TokenResponse = response.json().await?;

        let info: UserInfo = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(ExternalProfile {
            subject: info.sub,
            email: info.email,
            email_verified: info.email_verified,
            name: info.name,
        })
    }
}
