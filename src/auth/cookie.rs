//! Refresh cookie parsing and construction.

use axum::http::header;

use crate::config::{AuthConfig, REFRESH_COOKIE_PATH};

/// Cookie name for the refresh token (long-lived, 14 days).
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// `Set-Cookie` value carrying a freshly issued refresh token.
pub fn refresh_cookie(raw_token: &str, config: &AuthConfig) -> String {
    build_refresh_cookie(raw_token, config.refresh_token_ttl_secs, config.secure_cookies)
}

/// `Set-Cookie` value that removes the refresh cookie.
pub fn clear_refresh_cookie(config: &AuthConfig) -> String {
    build_refresh_cookie("", 0, config.secure_cookies)
}

fn build_refresh_cookie(value: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path={}; Max-Age={}{}",
        REFRESH_COOKIE_NAME, value, REFRESH_COOKIE_PATH, max_age, secure
    )
}
