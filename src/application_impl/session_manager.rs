use crate::application_port::{AuthError, NO_REFRESH_TOKEN, SESSION_ENDED, SessionService};
use crate::domain_model::{
    AccessToken, AuthUser, Credentials, DecodedToken, RefreshToken, Session, TokenStore,
};
use crate::domain_port::{ACCESS_TOKEN_COOKIE, AuthApi, Cookie, REFRESH_TOKEN_COOKIE, SessionStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub struct AuthSessionManager {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn SessionStore>,
    tokens: TokenStore,
    pending: AtomicUsize,
    // Orders session changes with their cookie writes.
    writes: Mutex<()>,
}

/// Marks the manager as loading for as long as it lives.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        LoadingGuard(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AuthSessionManager {
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            api,
            store,
            tokens: TokenStore::new(),
            pending: AtomicUsize::new(0),
            writes: Mutex::new(()),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    async fn persist(&self, cookie: Cookie) {
        let name = cookie.name.clone();
        if let Err(e) = self.store.set(cookie).await {
            warn!("failed to persist {}: {}", name, e);
        }
    }

    async fn forget(&self, name: &str) {
        if let Err(e) = self.store.clear(name).await {
            warn!("failed to clear {}: {}", name, e);
        }
    }

    async fn load(&self, name: &str) -> Option<String> {
        match self.store.get(name).await {
            Ok(value) => value,
            Err(e) => {
                warn!("failed to read {}: {}", name, e);
                None
            }
        }
    }

    async fn clear_all(&self) {
        let _writes = self.writes.lock().await;
        self.tokens.clear();
        self.forget(ACCESS_TOKEN_COOKIE).await;
        self.forget(REFRESH_TOKEN_COOKIE).await;
    }
}

#[async_trait::async_trait]
impl SessionService for AuthSessionManager {
    #[instrument(skip(self))]
    async fn login(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let _loading = LoadingGuard::enter(&self.pending);

        let pair = self.api.login(&credentials).await.map_err(|e| {
            debug!("login rejected: {}", e);
            AuthError::InvalidCredentials(e.upstream_message())
        })?;

        let user = DecodedToken::decode(&pair.access_token)
            .map_err(|e| AuthError::InvalidCredentials(e.to_string()))?
            .user();

        let _writes = self.writes.lock().await;
        self.tokens.set_session(
            pair.access_token.clone(),
            pair.refresh_token.clone(),
            user.clone(),
        );
        self.persist(Cookie::access_token(pair.access_token.0)).await;
        self.persist(Cookie::refresh_token(pair.refresh_token.0)).await;

        info!(user_id = %user.id, "signed in");
        Ok(self.tokens.snapshot())
    }

    #[instrument(skip(self))]
    async fn refresh_access_token(&self) -> Result<AccessToken, AuthError> {
        let Some((refresh_token, epoch)) = self.tokens.refresh_ticket() else {
            return Err(AuthError::RefreshFailed(NO_REFRESH_TOKEN.to_string()));
        };
        let _loading = LoadingGuard::enter(&self.pending);

        let access_token = self
            .api
            .refresh(&refresh_token)
            .await
            .map_err(|e| AuthError::RefreshFailed(e.upstream_message()))?;

        let user = DecodedToken::decode(&access_token)
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?
            .user();

        let _writes = self.writes.lock().await;
        if !self.tokens.replace_access_in(epoch, access_token.clone(), user) {
            debug!("session changed while refreshing, discarding new token");
            return Err(AuthError::RefreshFailed(SESSION_ENDED.to_string()));
        }
        self.persist(Cookie::access_token(access_token.as_str())).await;

        debug!("access token refreshed");
        Ok(access_token)
    }

    #[instrument(skip(self))]
    async fn logout(&self) {
        let _loading = LoadingGuard::enter(&self.pending);

        match self.tokens.refresh_token() {
            Some(refresh_token) => {
                if let Err(e) = self.api.logout(&refresh_token).await {
                    warn!("logout request failed: {}", e);
                }
            }
            None => debug!("no refresh token to revoke"),
        }

        self.clear_all().await;
        info!("signed out");
    }

    #[instrument(skip(self))]
    async fn initialize(&self) {
        let access = self.load(ACCESS_TOKEN_COOKIE).await.map(AccessToken);
        let refresh = self.load(REFRESH_TOKEN_COOKIE).await.map(RefreshToken);

        let Some(access) = access else {
            self.tokens.restore(None, refresh);
            debug!("no stored access token");
            return;
        };

        let expired = DecodedToken::decode(&access)
            .map(|decoded| decoded.is_expired_at(chrono::Utc::now().timestamp_millis()))
            .unwrap_or(true);
        self.tokens.restore(Some(access), refresh);

        if !expired {
            debug!("restored session");
            return;
        }

        // Nothing is on screen yet, so a failed refresh only drops the session.
        if let Err(e) = self.refresh_access_token().await {
            info!("stored session could not be refreshed: {}", e);
            self.clear_all().await;
        }
    }

    fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated()
    }

    fn is_expired(&self) -> bool {
        self.tokens.is_expired()
    }

    fn is_loading(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    fn has_role(&self, role: &str) -> bool {
        self.tokens
            .user()
            .map(|user| user.has_role(role))
            .unwrap_or(false)
    }

    fn access_token(&self) -> Option<AccessToken> {
        self.tokens.access_token()
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.tokens.user()
    }

    fn session(&self) -> Session {
        self.tokens.snapshot()
    }
}
