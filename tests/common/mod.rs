#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use confdesk::{
    ServerConfig,
    auth::{ClientIpSource, issue_session},
    create_app,
    db::{Database, UserRole},
    identity::ExternalProfile,
    jwt::{JwtConfig, TokenClaims, TokenType},
    oauth::{OAuthError, ProfileExchange},
};
use jsonwebtoken::{EncodingKey, Header};
use tower::ServiceExt;
use url::Url;

pub const JWT_SECRET: &[u8] = b"test-jwt-secret-for-integration-tests";
pub const TEST_IP: &str = "203.0.113.10";

/// Identity provider stand-in: hands out whatever profile the test set.
#[derive(Default)]
pub struct FakeExchange {
    profile: Mutex<Option<ExternalProfile>>,
}

impl FakeExchange {
    pub fn set_profile(&self, email: &str, verified: bool) {
        *self.profile.lock().unwrap() = Some(ExternalProfile {
            subject: format!("sub-{}", email),
            email: email.to_string(),
            email_verified: verified,
            name: Some("Test Person".to_string()),
        });
    }
}

#[async_trait]
impl ProfileExchange for FakeExchange {
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<Url, OAuthError> {
        let mut url = Url::parse("https://idp.test/authorize")?;
        url.query_pairs_mut()
            .append_pair("state", state)
            .append_pair("redirect_uri", redirect_uri);
        Ok(url)
    }

    async fn exchange(&self, code: &str, _redirect_uri: &str) -> Result<ExternalProfile, OAuthError> {
        if code != "good-code" {
            return Err(OAuthError::Rejected("400 Bad Request".to_string()));
        }
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| OAuthError::Rejected("no profile".to_string()))
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
    pub exchange: Arc<FakeExchange>,
}

/// Test app with in-memory database, fake identity provider and
/// `X-Forwarded-For` client IPs.
pub async fn create_test_app() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let exchange = Arc::new(FakeExchange::default());
    let config = ServerConfig {
        db: db.clone(),
        public_origin: Url::parse("http://localhost:7291").expect("Invalid URL"),
        jwt_secret: JWT_SECRET.to_vec(),
        secure_cookies: false,
        ip_source: ClientIpSource::ForwardedFor,
        oauth: Some(exchange.clone() as Arc<dyn ProfileExchange>),
    };
    TestApp {
        app: create_app(&config),
        db,
        jwt: JwtConfig::new(JWT_SECRET),
        exchange,
    }
}

/// Test app without an identity provider.
pub async fn create_test_app_without_oauth() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        public_origin: Url::parse("http://localhost:7291").expect("Invalid URL"),
        jwt_secret: JWT_SECRET.to_vec(),
        secure_cookies: false,
        ip_source: ClientIpSource::ForwardedFor,
        oauth: None,
    };
    TestApp {
        app: create_app(&config),
        db,
        jwt: JwtConfig::new(JWT_SECRET),
        exchange: Arc::new(FakeExchange::default()),
    }
}

/// Tokens of a logged-in principal.
pub struct Session {
    pub access: String,
    pub refresh: String,
}

impl Session {
    pub fn cookie_header(&self) -> String {
        format!("accessToken={}; refreshToken={}", self.access, self.refresh)
    }

    pub fn refresh_cookie(&self) -> String {
        format!("refreshToken={}", self.refresh)
    }

    pub fn access_cookie(&self) -> String {
        format!("accessToken={}", self.access)
    }
}

/// Value of a `name=value; ...` Set-Cookie string.
pub fn cookie_value<'a>(cookies: &'a [String], name: &str) -> Option<&'a str> {
    cookies.iter().find_map(|c| {
        c.split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .filter(|(key, _)| *key == name)
            .map(|(_, value)| value)
    })
}

pub async fn login(db: &Database, jwt: &JwtConfig, email: &str, id: i64) -> Session {
    let cookies = issue_session(db, jwt, email, id, false).await.unwrap();
    let set_cookies = vec![cookies.access, cookies.refresh];
    Session {
        access: cookie_value(&set_cookies, "accessToken").unwrap().to_string(),
        refresh: cookie_value(&set_cookies, "refreshToken").unwrap().to_string(),
    }
}

/// Register an author and log them in.
pub async fn login_author(t: &TestApp, email: &str) -> (i64, Session) {
    let id = t
        .db
        .users()
        .create(email, "Author", UserRole::Author)
        .await
        .unwrap();
    (id, login(&t.db, &t.jwt, email, id).await)
}

/// Provision a chair and log them in.
pub async fn login_chair(t: &TestApp, email: &str) -> (i64, Session) {
    let id = t.db.chairs().create(email, "Chair").await.unwrap();
    (id, login(&t.db, &t.jwt, email, id).await)
}

/// Sign a token with arbitrary claims, e.g. an already expired one.
pub fn forge_token(email: &str, id: i64, token_type: TokenType, exp_offset_secs: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let claims = TokenClaims {
        jti: "forged".to_string(),
        email: email.to_string(),
        id,
        token_type,
        iat: (now - 7200) as u64,
        exp: (now + exp_offset_secs) as u64,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET),
    )
    .unwrap()
}

pub async fn send(app: &Router, method: &str, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", TEST_IP);
    if let Some(cookie) = cookie {
        request = request.header("cookie", cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Check if cookies contain a token being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=;", cookie_name)) && c.contains("Max-Age=0"))
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub async fn stored_hash(db: &Database, email: &str) -> Option<String> {
    db.refresh_tokens()
        .get(email)
        .await
        .unwrap()
        .map(|r| r.hashed_token)
}
