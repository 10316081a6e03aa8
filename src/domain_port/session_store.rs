use std::time::Duration;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

pub const ACCESS_TOKEN_MAX_AGE: Duration = Duration::from_secs(60 * 60);
pub const REFRESH_TOKEN_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CookieAttributes {
    pub max_age: Duration,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieAttributes {
    /// Attributes used for both auth cookies.
    pub fn strict(max_age: Duration) -> Self {
        Self {
            max_age,
            http_only: true,
            secure: true,
            same_site: SameSite::Strict,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub attributes: CookieAttributes,
}

impl Cookie {
    pub fn access_token(value: impl Into<String>) -> Self {
        Cookie {
            name: ACCESS_TOKEN_COOKIE.to_string(),
            value: value.into(),
            attributes: CookieAttributes::strict(ACCESS_TOKEN_MAX_AGE),
        }
    }

    pub fn refresh_token(value: impl Into<String>) -> Self {
        Cookie {
            name: REFRESH_TOKEN_COOKIE.to_string(),
            value: value.into(),
            attributes: CookieAttributes::strict(REFRESH_TOKEN_MAX_AGE),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt session data: {0}")]
    Corrupt(String),
}

/// Cookie-like persistence for session tokens. Entries older than their
/// `max_age` read as absent.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, cookie: Cookie) -> Result<(), StoreError>;
    async fn clear(&self, name: &str) -> Result<(), StoreError>;
}
