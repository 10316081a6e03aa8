use crate::domain_model::{AccessToken, Credentials, RefreshToken};

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthApiError {
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl AuthApiError {
    /// Message as reported upstream, without the variant prefix.
    pub fn upstream_message(&self) -> String {
        match self {
            AuthApiError::Rejected { message, .. } => message.clone(),
            AuthApiError::Transport(m) | AuthApiError::InvalidResponse(m) => m.clone(),
        }
    }
}

/// The external auth server.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, AuthApiError>;
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<AccessToken, AuthApiError>;
    async fn logout(&self, refresh_token: &RefreshToken) -> Result<(), AuthApiError>;
}
