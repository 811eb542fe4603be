//! Axum extractors for authentication.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::ip::extract_client_ip;
use super::state::HasAuthBackend;
use super::types::{AuthenticatedUser, ClientMeta};

/// Read the token from an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Extractor for endpoints that require a valid access token.
///
/// Validation is stateless: signature, expiry, issuer and audience only.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or(ApiAuthError::new(AuthErrorKind::NotAuthenticated))?;

        let claims = state.auth().issuer().validate(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            ApiAuthError::new(AuthErrorKind::InvalidToken)
        })?;

        Ok(Auth(claims.into()))
    }
}

/// Client IP and user agent of the request. Never rejects.
pub struct ClientInfo(pub ClientMeta);

impl<S> FromRequestParts<S> for ClientInfo
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ip = extract_client_ip(parts, state.auth().config().ip_header.as_deref()).ok();
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(ClientInfo(ClientMeta { ip, user_agent }))
    }
}
