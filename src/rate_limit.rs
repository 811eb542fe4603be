//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down credential
//! stuffing, signup spam and refresh loops.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

use crate::auth::extract_client_ip;
use crate::config::AuthConfig;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Login: burst of 5, refilled at 1 per second
    pub login: Arc<IpLimiter>,
    /// Registration: 3 per minute
    pub register: Arc<IpLimiter>,
    /// Refresh: 10 per second
    pub refresh: Arc<IpLimiter>,
}

/// Middleware state: the limiters plus the auth settings that name the
/// client-IP header.
#[derive(Clone)]
pub struct RateLimitState {
    pub limits: Arc<RateLimitConfig>,
    pub auth: Arc<AuthConfig>,
}

const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::new(1).unwrap();
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();
const REGISTER_PER_MIN: NonZeroU32 = NonZeroU32::new(3).unwrap();
const REFRESH_PER_SEC: NonZeroU32 = NonZeroU32::new(10).unwrap();
const PERMISSIVE_PER_SEC: NonZeroU32 = NonZeroU32::new(10_000).unwrap();

impl RateLimitConfig {
    /// Create rate limiters with production limits.
    pub fn new() -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(LOGIN_PER_SEC).allow_burst(LOGIN_BURST),
            )),
            register: Arc::new(RateLimiter::keyed(Quota::per_minute(REGISTER_PER_MIN))),
            refresh: Arc::new(RateLimiter::keyed(Quota::per_second(REFRESH_PER_SEC))),
        }
    }

    /// Limits high enough to never trigger in tests.
    pub fn permissive() -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(Quota::per_second(PERMISSIVE_PER_SEC))),
            register: Arc::new(RateLimiter::keyed(Quota::per_second(PERMISSIVE_PER_SEC))),
            refresh: Arc::new(RateLimiter::keyed(Quota::per_second(PERMISSIVE_PER_SEC))),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn check(limiter: &IpLimiter, ip_header: Option<&str>, request: &Request) -> Result<(), Response> {
    let ip = match extract_client_ip(request, ip_header) {
        Ok(ip) => ip,
        Err(reason) => {
            tracing::warn!(reason, "Rejecting request without client IP");
            return Err(
                (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response(),
            );
        }
    };

    limiter.check_key(&ip).map_err(|_| {
        tracing::debug!(ip = %ip, "Rate limit hit");
        (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.",
        )
            .into_response()
    })
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    match check(&state.limits.login, state.auth.ip_header.as_deref(), &request) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

/// Middleware for rate limiting registration.
pub async fn rate_limit_register(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    match check(&state.limits.register, state.auth.ip_header.as_deref(), &request) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}

/// Middleware for rate limiting token refresh.
pub async fn rate_limit_refresh(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    match check(&state.limits.refresh, state.auth.ip_header.as_deref(), &request) {
        Ok(()) => next.run(request).await,
        Err(response) => response,
    }
}
