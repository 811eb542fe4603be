//! Authentication user and token types.

use serde::Serialize;

use crate::db::UserRole;
use crate::jwt::AccessClaims;

/// Caller identity taken from a validated access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// User UUID (`sub` claim)
    pub uuid: String,
    pub email: String,
    pub role: UserRole,
}

impl From<AccessClaims> for AuthenticatedUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            uuid: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Client metadata recorded on new refresh sessions. Advisory only.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Access token response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEnvelope {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Result of login or refresh: the response body plus the raw refresh token,
/// which only ever leaves the server in the refresh cookie.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub envelope: TokenEnvelope,
    pub refresh_token: String,
}

/// Public view of a newly registered user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    /// User UUID
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
}
