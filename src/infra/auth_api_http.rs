use crate::domain_model::{AccessToken, Credentials, RefreshToken};
use crate::domain_port::{AuthApi, AuthApiError, TokenPair};
use crate::infra::http::{build_url, error_message};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const LOGOUT_PATH: &str = "/api/auth/logout";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// `AuthApi` backed by the auth server's JSON endpoints.
pub struct HttpAuthApi {
    client: reqwest::Client,
    api_base: String,
}

impl HttpAuthApi {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, AuthApiError> {
        let url = build_url(&self.api_base, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthApiError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(AuthApiError::Rejected {
            status,
            message: error_message(&body),
        })
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    #[instrument(skip(self))]
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, AuthApiError> {
        let response: LoginResponse = self
            .post(LOGIN_PATH, credentials)
            .await?
            .json()
            .await
            .map_err(|e| AuthApiError::InvalidResponse(e.to_string()))?;

        Ok(TokenPair {
            access_token: AccessToken(response.access_token),
            refresh_token: RefreshToken(response.refresh_token),
        })
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<AccessToken, AuthApiError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.as_str(),
        };
        let response: RefreshResponse = self
            .post(REFRESH_PATH, &body)
            .await?
            .json()
            .await
            .map_err(|e| AuthApiError::InvalidResponse(e.to_string()))?;

        Ok(AccessToken(response.access_token))
    }

    #[instrument(skip_all)]
    async fn logout(&self, refresh_token: &RefreshToken) -> Result<(), AuthApiError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.as_str(),
        };
        self.post(LOGOUT_PATH, &body).await?;
        Ok(())
    }
}
