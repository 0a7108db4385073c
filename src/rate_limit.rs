//! Rate limiting for login endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to prevent brute force attacks.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::debug;

use crate::auth::{ClientIpSource, extract_client_ip};

/// Per-IP rate limiter for endpoint-specific limiting.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const OAUTH_START_PER_SEC: NonZeroU32 = NonZeroU32::new(10).unwrap();
const OAUTH_CALLBACK_PER_SEC: NonZeroU32 = NonZeroU32::MIN;
const OAUTH_CALLBACK_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();

/// Rate limiting configuration for the OAuth login routes.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login start (generous: 10 requests per second)
    pub oauth_start: Arc<IpLimiter>,
    /// Per-IP limiter for login callback (strict: 5 requests, then 1 per second)
    pub oauth_callback: Arc<IpLimiter>,
    /// Where the client IP used as limiter key comes from
    pub ip_source: ClientIpSource,
}

impl RateLimitConfig {
    /// Create rate limiters with the default quotas.
    pub fn new(ip_source: ClientIpSource) -> Self {
        Self::with_quotas(
            ip_source,
            Quota::per_second(OAUTH_START_PER_SEC),
            Quota::per_second(OAUTH_CALLBACK_PER_SEC).allow_burst(OAUTH_CALLBACK_BURST),
        )
    }

    pub fn with_quotas(ip_source: ClientIpSource, start: Quota, callback: Quota) -> Self {
        Self {
            oauth_start: Arc::new(RateLimiter::keyed(start)),
            oauth_callback: Arc::new(RateLimiter::keyed(callback)),
            ip_source,
        }
    }
}

async fn check_limit(
    limiter: &IpLimiter,
    ip_source: ClientIpSource,
    request: Request,
    next: Next,
    message: &'static str,
) -> Response {
    let ip = match extract_client_ip(&request, ip_source) {
        Ok(ip) => ip,
        Err(reason) => {
            debug!(reason, "Rejecting request without client IP");
            return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
        }
    };

    match limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            debug!(ip = %ip, "Rate limit exceeded");
            (StatusCode::TOO_MANY_REQUESTS, message).into_response()
        }
    }
}

/// Middleware for rate limiting OAuth start endpoints.
pub async fn rate_limit_oauth_start(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check_limit(
        &config.oauth_start,
        config.ip_source,
        request,
        next,
        "Too many requests. Please try again later.",
    )
    .await
}

/// Middleware for rate limiting OAuth callback endpoints.
pub async fn rate_limit_oauth_callback(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check_limit(
        &config.oauth_callback,
        config.ip_source,
        request,
        next,
        "Too many authentication attempts. Please wait before trying again.",
    )
    .await
}
