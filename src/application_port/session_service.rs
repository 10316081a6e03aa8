use crate::domain_model::{AccessToken, AuthUser, Credentials, Session};

pub const NO_REFRESH_TOKEN: &str = "No refresh token available";
pub const SESSION_ENDED: &str = "Session ended during refresh";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("refresh failed: {0}")]
    RefreshFailed(String),
    #[error("not authenticated")]
    Unauthorized,
    #[error("request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("response error: {0}")]
    Decode(String),
    #[error("request error: {0}")]
    Encode(String),
}

impl AuthError {
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    async fn login(&self, credentials: Credentials) -> Result<Session, AuthError>;
    async fn refresh_access_token(&self) -> Result<AccessToken, AuthError>;
    /// Always clears the local session, whatever happens on the network.
    async fn logout(&self);
    async fn initialize(&self);

    fn is_authenticated(&self) -> bool;
    fn is_expired(&self) -> bool;
    fn is_loading(&self) -> bool;
    fn has_role(&self, role: &str) -> bool;
    fn access_token(&self) -> Option<AccessToken>;
    fn current_user(&self) -> Option<AuthUser>;
    fn session(&self) -> Session;
}
