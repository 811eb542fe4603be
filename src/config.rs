//! Immutable authentication settings, built once at startup and shared by
//! the token issuer, the auth service and the HTTP handlers.

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Refresh session lifetime: 14 days.
pub const REFRESH_TOKEN_TTL_SECS: u64 = 14 * 24 * 60 * 60;

/// Path the refresh cookie is scoped to.
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// `iss` claim written into and required on access tokens
    pub issuer: String,
    /// `aud` claim written into and required on access tokens
    pub audience: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    /// Whether to set the Secure flag on the refresh cookie
    pub secure_cookies: bool,
    /// Header carrying the client IP when running behind a proxy.
    /// When unset the socket address is used.
    pub ip_header: Option<String>,
}

impl AuthConfig {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            access_token_ttl_secs: ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: REFRESH_TOKEN_TTL_SECS,
            secure_cookies: true,
            ip_header: None,
        }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn with_ip_header(mut self, header: Option<String>) -> Self {
        self.ip_header = header;
        self
    }
}
