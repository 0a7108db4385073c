pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod identity;
pub mod jwt;
pub mod oauth;
pub mod rate_limit;

use api::create_api_router;
use api::oauth::OAuthState;
use auth::ClientIpSource;
use axum::Router;
use db::Database;
use jwt::JwtConfig;
use oauth::ProfileExchange;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use url::Url;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Public origin, base of the OAuth callback URLs
    pub public_origin: Url,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Where the client IP used for rate limiting is read from
    pub ip_source: ClientIpSource,
    /// Identity provider for the login routes; `None` disables them
    pub oauth: Option<Arc<dyn ProfileExchange>>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret));

    let api_router = create_api_router(config.db.clone(), jwt.clone(), config.secure_cookies);
    let app = Router::new().nest("/api", api_router);

    match &config.oauth {
        Some(exchange) => {
            let oauth_state = OAuthState {
                db: config.db.clone(),
                jwt,
                secure_cookies: config.secure_cookies,
                exchange: exchange.clone(),
                public_origin: config.public_origin.clone(),
                rate_limit_config: Arc::new(RateLimitConfig::new(config.ip_source)),
            };
            app.nest("/auth", api::oauth::router(oauth_state))
        }
        None => {
            info!("No identity provider configured, login routes disabled");
            app
        }
    }
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    init_cleanup(&config.db).await;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    Ok((handle, local_addr))
}
