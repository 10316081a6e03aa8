use crate::domain_model::{AccessToken, Credentials, RefreshToken};
use crate::domain_port::{AuthApi, AuthApiError, TokenPair};
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

const FAKE_SIGNING_KEY: &[u8] = b"gatekeeper-fake-auth";

#[derive(Debug, Serialize)]
struct FakeClaims<'a> {
    sub: &'a str,
    email: &'a str,
    roles: &'a [String],
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
struct FakeAccount {
    id: String,
    password: String,
    roles: Vec<String>,
}

/// In-process auth server. Issues real (HS256) JWTs for registered accounts,
/// counts calls, and can be told to fail or slow down.
pub struct FakeAuthApi {
    accounts: DashMap<String, FakeAccount>,
    refresh_tokens: DashMap<String, String>,
    revoked: DashSet<String>,
    access_ttl_secs: Mutex<i64>,
    latency: Mutex<Duration>,
    refresh_latency: Mutex<Duration>,
    fail_refresh: AtomicBool,
    fail_logout: AtomicBool,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl Default for FakeAuthApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAuthApi {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            refresh_tokens: DashMap::new(),
            revoked: DashSet::new(),
            access_ttl_secs: Mutex::new(15 * 60),
            latency: Mutex::new(Duration::ZERO),
            refresh_latency: Mutex::new(Duration::ZERO),
            fail_refresh: AtomicBool::new(false),
            fail_logout: AtomicBool::new(false),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_account(self, email: &str, password: &str, roles: &[&str]) -> Self {
        self.add_account(email, password, roles);
        self
    }

    pub fn add_account(&self, email: &str, password: &str, roles: &[&str]) {
        let id = format!("user-{}", self.accounts.len() + 1);
        self.accounts.insert(
            email.to_string(),
            FakeAccount {
                id,
                password: password.to_string(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
    }

    /// Lifetime of newly issued access tokens. Negative values issue tokens
    /// that are already expired.
    pub fn set_access_ttl_secs(&self, secs: i64) {
        *self.access_ttl_secs.lock().unwrap_or_else(|e| e.into_inner()) = secs;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    /// Delay between a refresh being decided and its answer arriving, on top
    /// of `set_latency`.
    pub fn set_refresh_latency(&self, latency: Duration) {
        *self.refresh_latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    pub fn set_fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_logout(&self, fail: bool) {
        self.fail_logout.store(fail, Ordering::SeqCst);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn is_revoked(&self, refresh_token: &RefreshToken) -> bool {
        self.revoked.contains(refresh_token.as_str())
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn issue_access(
        &self,
        email: &str,
        account: &FakeAccount,
    ) -> Result<AccessToken, AuthApiError> {
        let ttl = *self.access_ttl_secs.lock().unwrap_or_else(|e| e.into_inner());
        let iat = Utc::now().timestamp();
        let claims = FakeClaims {
            sub: &account.id,
            email,
            roles: &account.roles,
            iat,
            exp: iat + ttl,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(FAKE_SIGNING_KEY),
        )
        .map(AccessToken)
        .map_err(|e| AuthApiError::InvalidResponse(e.to_string()))
    }

    fn check_refresh(&self, refresh_token: &RefreshToken) -> Result<AccessToken, AuthApiError> {
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(Self::rejected(401, "Refresh token expired"));
        }
        if self.revoked.contains(refresh_token.as_str()) {
            return Err(Self::rejected(401, "Refresh token revoked"));
        }

        let email = self
            .refresh_tokens
            .get(refresh_token.as_str())
            .map(|e| e.value().clone())
            .ok_or_else(|| Self::rejected(401, "Unknown refresh token"))?;
        let account = self
            .accounts
            .get(&email)
            .map(|a| a.value().clone())
            .ok_or_else(|| Self::rejected(401, "Unknown account"))?;

        self.issue_access(&email, &account)
    }

    fn rejected(status: u16, message: &str) -> AuthApiError {
        AuthApiError::Rejected {
            status,
            message: message.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, AuthApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let account = self
            .accounts
            .get(&credentials.email)
            .map(|a| a.value().clone())
            .filter(|a| a.password == credentials.password)
            .ok_or_else(|| Self::rejected(401, "Invalid email or password"))?;

        let access_token = self.issue_access(&credentials.email, &account)?;
        let refresh_token = uuid::Uuid::new_v4().to_string();
        self.refresh_tokens
            .insert(refresh_token.clone(), credentials.email.clone());

        Ok(TokenPair {
            access_token,
            refresh_token: RefreshToken(refresh_token),
        })
    }

    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<AccessToken, AuthApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let outcome = self.check_refresh(refresh_token);

        let answer_delay = *self.refresh_latency.lock().unwrap_or_else(|e| e.into_inner());
        if !answer_delay.is_zero() {
            tokio::time::sleep(answer_delay).await;
        }
        outcome
    }

    async fn logout(&self, refresh_token: &RefreshToken) -> Result<(), AuthApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(AuthApiError::Transport("connection reset".to_string()));
        }
        self.refresh_tokens.remove(refresh_token.as_str());
        self.revoked.insert(refresh_token.as_str().to_string());
        Ok(())
    }
}
