//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::ClientIpSource;
use crate::db::{Database, normalize_email};
use crate::oauth::ProfileExchange;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "confdesk",
    about = "Session and identity server for conference management"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "confdesk.db")]
    pub database: String,

    /// Public origin of the server (full URL). HTTPS enables Secure cookies
    #[arg(long, default_value = "http://localhost:7291")]
    pub public_origin: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Google OAuth client ID. Login routes are disabled without it.
    /// The client secret is read from GOOGLE_CLIENT_SECRET
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// Where to read the client IP for rate limiting
    #[arg(long, value_enum, default_value = "socket")]
    pub client_ip: ClientIpSource,

    /// Register a conference chair with this email on startup
    #[arg(long, value_name = "EMAIL")]
    pub create_chair: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Read a secret from the environment and clear the variable.
fn take_env_secret(name: &str) -> Option<String> {
    let secret = std::env::var(name).ok()?;
    // SAFETY: We're single-threaded at this point during startup,
    // and no other code is reading this environment variable.
    unsafe { std::env::remove_var(name) };
    Some(secret)
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Some(secret) = take_env_secret("JWT_SECRET") {
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load the Google OAuth client secret from GOOGLE_CLIENT_SECRET.
/// Returns None and logs an error if it is missing.
pub fn load_google_client_secret() -> Option<String> {
    match take_env_secret("GOOGLE_CLIENT_SECRET") {
        Some(secret) if !secret.trim().is_empty() => Some(secret.trim().to_string()),
        _ => {
            error!("GOOGLE_CLIENT_SECRET is required when a Google client ID is set");
            None
        }
    }
}

/// Parse and validate the public origin URL.
/// Returns None and logs an error if validation fails.
pub fn validate_public_origin(public_origin: &str) -> Option<Url> {
    let url = match Url::parse(public_origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %public_origin, error = %e, "Invalid public-origin URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = url.host_str() == Some("localhost");

    if !is_https && !is_localhost {
        error!("public-origin must use HTTPS for non-localhost deployments");
        return None;
    }

    // Cookies and callback URLs are rooted at `/`
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        error!(origin = %public_origin, "public-origin must not carry a path, query or fragment");
        return None;
    }

    Some(url)
}

/// Handle the --create-chair flag: register the chair unless it already exists.
pub async fn handle_create_chair(db: &Database, email: &str) {
    let email = normalize_email(email);

    match db.chairs().get_by_email(&email).await {
        Ok(Some(existing)) => {
            info!(email = %existing.email, id = existing.id, "Chair already exists");
        }
        Ok(None) => {
            let name = email.split('@').next().unwrap_or_default();
            match db.chairs().create(&email, name).await {
                Ok(id) => info!(email = %email, id, "Chair created"),
                Err(e) => {
                    error!(error = %e, "Failed to create chair");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing chair");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    public_origin: Url,
    jwt_secret: String,
    ip_source: ClientIpSource,
    oauth: Option<Arc<dyn ProfileExchange>>,
) -> ServerConfig {
    let secure_cookies = public_origin.scheme() == "https";

    ServerConfig {
        db,
        public_origin,
        jwt_secret: jwt_secret.into_bytes(),
        secure_cookies,
        ip_source,
        oauth,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
