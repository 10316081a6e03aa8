use crate::domain_model::AuthUser;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tokens are treated as expired this long before their `exp` claim.
pub const EXPIRY_BUFFER_MS: i64 = 10_000;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RefreshToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken(***)")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenDecodeError {
    #[error("malformed token: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: String,
    exp: i64,
    #[serde(default)]
    iat: i64,
    #[serde(default)]
    roles: Vec<String>,
    email: String,
}

/// Payload of an access token as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub subject_id: String,
    pub expires_at: i64,
    pub issued_at: i64,
    pub roles: Vec<String>,
    pub email: String,
}

impl DecodedToken {
    /// Reads the claims without verifying the signature. The client never
    /// holds the signing key; the auth server remains the only verifier.
    pub fn decode(token: &AccessToken) -> Result<Self, TokenDecodeError> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<AccessClaims>(
            token.as_str(),
            &DecodingKey::from_secret(&[]),
            &validation,
        )
        .map_err(|e| TokenDecodeError::Malformed(e.to_string()))?;

        let claims = data.claims;
        Ok(DecodedToken {
            subject_id: claims.sub,
            expires_at: claims.exp,
            issued_at: claims.iat,
            roles: claims.roles,
            email: claims.email,
        })
    }

    pub fn expires_at_ms(&self) -> i64 {
        self.expires_at.saturating_mul(1000)
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms().saturating_sub(EXPIRY_BUFFER_MS)
    }

    pub fn user(&self) -> AuthUser {
        AuthUser {
            id: self.subject_id.clone(),
            email: self.email.clone(),
            roles: self.roles.clone(),
        }
    }
}
