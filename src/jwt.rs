//! Access token issuing and validation.
//!
//! Access tokens are RS256-signed JWTs, valid for 15 minutes and never stored
//! server-side. Verification only needs the public key, so other services can
//! validate them with the same issuer/audience checks.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::AuthConfig;
use crate::db::UserRole;

/// JWT claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user UUID)
    pub sub: String,
    pub iss: String,
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    pub email: String,
    pub role: UserRole,
}

/// Result of minting an access token.
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    /// The JWT token string
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
}

/// Signs and verifies access tokens with an RSA key pair.
#[derive(Clone)]
pub struct AccessTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    ttl_secs: u64,
}

impl AccessTokenIssuer {
    /// Build an issuer from PEM encoded RSA keys (PKCS#1 or PKCS#8 private key,
    /// SPKI or PKCS#1 public key).
    pub fn from_rsa_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        config: &AuthConfig,
    ) -> Result<Self, JwtError> {
        Ok(Self {
            encoding_key: EncodingKey::from_rsa_pem(private_pem).map_err(JwtError::Key)?,
            decoding_key: DecodingKey::from_rsa_pem(public_pem).map_err(JwtError::Key)?,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl_secs: config.access_token_ttl_secs,
        })
    }

    /// Mint an access token for a user.
    pub fn issue(
        &self,
        user_uuid: &str,
        email: &str,
        role: UserRole,
    ) -> Result<AccessTokenResult, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::TimeError)?
            .as_secs();

        let claims = AccessClaims {
            sub: user_uuid.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.ttl_secs,
            email: email.to_string(),
            role,
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(JwtError::Encoding)?;

        Ok(AccessTokenResult {
            token,
            duration: self.ttl_secs,
        })
    }

    /// Verify signature, expiry, issuer and audience, and decode the claims.
    pub fn validate(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
                .map_err(JwtError::Decoding)?;

        Ok(token_data.claims)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Invalid signing key: {0}")]
    Key(jsonwebtoken::errors::Error),
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("Failed to decode token: {0}")]
    Decoding(jsonwebtoken::errors::Error),
    #[error("System time error")]
    TimeError,
}
