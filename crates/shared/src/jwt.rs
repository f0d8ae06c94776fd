//! Bearer token validation.
//!
//! Identity is owned by the external auth provider. The backend only verifies
//! RS256 tokens against the provider's public key; a private key may be
//! configured so development tooling and tests can mint their own tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default leeway in seconds for clock skew tolerance.
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

/// Error type for JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingError(String),

    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Token signing is not configured")]
    SigningDisabled,
}

/// Claims the auth provider puts in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Verifier (and optional signer) for bearer tokens.
#[derive(Clone)]
pub struct JwtConfig {
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    encoding_key: Option<EncodingKey>,
    pub token_expiry_secs: i64,
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("token_expiry_secs", &self.token_expiry_secs)
            .field("leeway_secs", &self.leeway_secs)
            .field("decoding_key", &"[REDACTED]")
            .field("can_sign", &self.encoding_key.is_some())
            .finish()
    }
}

impl JwtConfig {
    /// Creates an RS256 verifier from the provider's public key in PEM format.
    ///
    /// Pass a private key only where tokens must be minted locally.
    pub fn from_rsa_pem(
        public_key_pem: &str,
        private_key_pem: Option<&str>,
        token_expiry_secs: i64,
        leeway_secs: u64,
    ) -> Result<Self, JwtError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(format!("Invalid public key: {}", e)))?;

        let encoding_key = private_key_pem
            .filter(|pem| !pem.trim().is_empty())
            .map(|pem| {
                EncodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| JwtError::InvalidKey(format!("Invalid private key: {}", e)))
            })
            .transpose()?;

        Ok(Self {
            algorithm: Algorithm::RS256,
            decoding_key,
            encoding_key,
            token_expiry_secs,
            leeway_secs,
        })
    }

    /// Creates an HS256 signer/verifier from a shared secret.
    pub fn from_secret(secret: &str, token_expiry_secs: i64) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: Some(EncodingKey::from_secret(secret.as_bytes())),
            token_expiry_secs,
            leeway_secs: 0,
        }
    }

    /// Mints an access token for `user_id`.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<String, JwtError> {
        let encoding_key = self.encoding_key.as_ref().ok_or(JwtError::SigningDisabled)?;
        let now = Utc::now();

        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::seconds(self.token_expiry_secs)).timestamp(),
            iat: now.timestamp(),
            email: email.map(str::to_string),
            name: name.map(str::to_string),
        };

        encode(&Header::new(self.algorithm), &claims, encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Validates a token and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidToken,
                _ => JwtError::DecodingError(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}

/// Extracts the user ID from validated claims.
pub fn extract_user_id(claims: &Claims) -> Result<Uuid, JwtError> {
    Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidToken)
}
