//! Client IP extraction utilities.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

/// Header set by a reverse proxy with the original client address.
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Where the client address is read from.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientIpSource {
    /// Peer address of the TCP connection
    #[default]
    Socket,
    /// First entry of `X-Forwarded-For` (only behind a trusted proxy)
    ForwardedFor,
}

/// Extract the client IP address.
///
/// With `ForwardedFor`, a missing or unreadable header is an error; there is
/// no fallback to the socket address.
pub fn extract_client_ip<B>(
    request: &Request<B>,
    ip_source: ClientIpSource,
) -> Result<String, &'static str> {
    match ip_source {
        ClientIpSource::ForwardedFor => {
            let value = request
                .headers()
                .get(FORWARDED_FOR_HEADER)
                .ok_or("IP header not present")?
                .to_str()
                .map_err(|_| "IP header contains invalid characters")?;
            value
                .split(',')
                .next()
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
                .ok_or("IP header is empty")
        }
        ClientIpSource::Socket => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .ok_or("No client IP available"),
    }
}
