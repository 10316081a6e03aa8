use crate::domain_model::{AccessToken, AuthUser, DecodedToken, RefreshToken};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
    pub user: Option<AuthUser>,
}

/// In-memory holder of the current session. Never performs I/O; persistence
/// is the session manager's job.
///
/// Every call that starts or ends a session bumps the epoch, so work begun
/// against one session cannot write into the next.
#[derive(Debug, Default)]
pub struct TokenStore {
    state: RwLock<Session>,
    epoch: AtomicU64,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.read();
        state.access_token.is_some() && state.user.is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }

    /// Missing and undecodable tokens both count as expired.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        let state = self.read();
        match &state.access_token {
            None => true,
            Some(token) => match DecodedToken::decode(token) {
                Ok(decoded) => decoded.is_expired_at(now_ms),
                Err(e) => {
                    tracing::debug!("access token failed to decode: {}", e);
                    true
                }
            },
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// The refresh token together with the epoch it belongs to.
    pub fn refresh_ticket(&self) -> Option<(RefreshToken, u64)> {
        let state = self.read();
        let token = state.refresh_token.clone()?;
        Some((token, self.epoch()))
    }

    pub fn set_session(&self, access: AccessToken, refresh: RefreshToken, user: AuthUser) {
        let mut state = self.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        state.access_token = Some(access);
        state.refresh_token = Some(refresh);
        state.user = Some(user);
    }

    /// Swaps the access token and its identity together, keeping the refresh
    /// token, but only while `epoch` is still current. Returns false and
    /// leaves the session alone otherwise.
    pub fn replace_access_in(&self, epoch: u64, access: AccessToken, user: AuthUser) -> bool {
        let mut state = self.write();
        if self.epoch() != epoch {
            return false;
        }
        state.access_token = Some(access);
        state.user = Some(user);
        true
    }

    /// Loads persisted tokens. The user is decoded when the access token
    /// allows it, whether or not it has expired.
    pub fn restore(&self, access: Option<AccessToken>, refresh: Option<RefreshToken>) {
        let user = access
            .as_ref()
            .and_then(|token| DecodedToken::decode(token).ok())
            .map(|decoded| decoded.user());

        let mut state = self.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        state.access_token = if user.is_some() { access } else { None };
        state.refresh_token = refresh;
        state.user = user;
    }

    pub fn clear(&self) {
        let mut state = self.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *state = Session::default();
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.read().refresh_token.clone()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.read().user.clone()
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
