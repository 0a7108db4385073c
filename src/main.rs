use std::sync::Arc;

use clap::Parser;
use confdesk::cli::{
    Args, build_config, handle_create_chair, init_logging, load_google_client_secret,
    load_jwt_secret, open_database, validate_public_origin,
};
use confdesk::oauth::{GoogleOAuth, ProfileExchange};
use confdesk::{init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let oauth: Option<Arc<dyn ProfileExchange>> = match args.google_client_id {
        Some(client_id) => {
            let Some(client_secret) = load_google_client_secret() else {
                std::process::exit(1);
            };
            Some(Arc::new(GoogleOAuth::new(client_id, client_secret)) as Arc<dyn ProfileExchange>)
        }
        None => None,
    };

    let Some(public_origin) = validate_public_origin(&args.public_origin) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = args.create_chair.as_deref() {
        handle_create_chair(&db, email).await;
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    if let Ok(local_addr) = listener.local_addr() {
        info!(address = %local_addr, "Listening");
    }

    init_cleanup(&db).await;

    let config = build_config(db, public_origin, jwt_secret, args.client_ip, oauth);
    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
