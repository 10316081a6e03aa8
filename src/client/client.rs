use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra::http::build_client;
use crate::infra::*;
use crate::settings::Settings;
use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

/// One authenticated application context: a session manager, its refresh
/// coordinator and the request gateway, all sharing the same session.
pub struct AuthClient {
    pub session: Arc<dyn SessionService>,
    pub coordinator: Arc<RefreshCoordinator>,
    pub gateway: Arc<AuthenticatedRequestGateway>,
}

impl AuthClient {
    pub fn try_new(settings: &Settings) -> Result<Self> {
        Url::parse(&settings.api.base)
            .map_err(|e| anyhow!("invalid api.base {:?}: {}", settings.api.base, e))?;

        let http = build_client(Duration::from_millis(settings.api.timeout_ms))?;

        let api: Arc<dyn AuthApi> = match settings.auth.backend.as_str() {
            "http" => Arc::new(HttpAuthApi::new(http.clone(), settings.api.base.clone())),
            "fake" => Arc::new(
                FakeAuthApi::new().with_account("demo@example.com", "demo", &["admin", "user"]),
            ),
            other => return Err(anyhow!("unknown auth backend: {other}")),
        };

        let store: Arc<dyn SessionStore> = match settings.session.backend.as_str() {
            "memory" => Arc::new(MemorySessionStore::new()),
            "file" => Arc::new(FileSessionStore::new(settings.session.path.clone())),
            other => return Err(anyhow!("unknown session backend: {other}")),
        };

        info!(
            api_base = %settings.api.base,
            auth = %settings.auth.backend,
            session = %settings.session.backend,
            "auth client configured"
        );

        Ok(Self::from_parts(
            http,
            &settings.api.base,
            api,
            store,
            Arc::new(LogNavigator),
            &settings.auth.sign_in_path,
        ))
    }

    pub fn from_parts(
        http: reqwest::Client,
        api_base: &str,
        api: Arc<dyn AuthApi>,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        sign_in_path: &str,
    ) -> Self {
        let session: Arc<dyn SessionService> = Arc::new(AuthSessionManager::new(api, store));
        let coordinator = Arc::new(RefreshCoordinator::new(
            session.clone(),
            navigator.clone(),
            sign_in_path,
        ));
        let gateway = Arc::new(AuthenticatedRequestGateway::new(
            http,
            api_base,
            session.clone(),
            coordinator.clone(),
            navigator,
            sign_in_path,
        ));

        Self {
            session,
            coordinator,
            gateway,
        }
    }
}
