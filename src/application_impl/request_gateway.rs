use crate::application_impl::RefreshCoordinator;
use crate::application_port::{AuthError, SessionService};
use crate::domain_port::Navigator;
use crate::infra::http::{build_url, error_message};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Verbs the authenticated gateway dispatches. There is no PATCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_reqwest().as_str())
    }
}

#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, AuthError> {
        let value = serde_json::to_value(body)
            .map_err(|e| AuthError::Encode(format!("Failed to encode request: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Outbound calls carrying the session's bearer token. Refreshes an expired
/// token before dispatch and ends the session on 401.
pub struct AuthenticatedRequestGateway {
    client: reqwest::Client,
    api_base: String,
    session: Arc<dyn SessionService>,
    coordinator: Arc<RefreshCoordinator>,
    navigator: Arc<dyn Navigator>,
    sign_in_path: String,
}

impl AuthenticatedRequestGateway {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        session: Arc<dyn SessionService>,
        coordinator: Arc<RefreshCoordinator>,
        navigator: Arc<dyn Navigator>,
        sign_in_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            session,
            coordinator,
            navigator,
            sign_in_path: sign_in_path.into(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AuthError> {
        self.request(GatewayRequest::new(Method::Get, path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, AuthError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = GatewayRequest::new(Method::Post, path).json(body)?;
        self.request(request).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, AuthError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = GatewayRequest::new(Method::Put, path).json(body)?;
        self.request(request).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, AuthError> {
        self.request(GatewayRequest::new(Method::Delete, path)).await
    }

    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: GatewayRequest,
    ) -> Result<T, AuthError> {
        if !self.session.is_authenticated() {
            return Err(AuthError::Unauthorized);
        }

        if self.session.is_expired() {
            debug!("access token expired, refreshing before dispatch");
            self.coordinator.refresh().await?;
        }

        // Read the token only now, so a refresh that just finished is used.
        let token = self.session.access_token().ok_or(AuthError::Unauthorized)?;
        let headers = merge_headers(token.as_str(), &request.headers)?;

        let url = build_url(&self.api_base, &request.path);
        let mut builder = self
            .client
            .request(request.method.as_reqwest(), &url)
            .headers(headers);
        if let Some(body) = &request.body {
            let payload = serde_json::to_vec(body)
                .map_err(|e| AuthError::Encode(format!("Failed to encode request: {e}")))?;
            builder = builder.body(payload);
        }

        let response = builder.send().await.map_err(map_request_error)?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::Network(format!("Failed to read response: {e}")))?;

        if status == StatusCode::UNAUTHORIZED {
            warn!("request rejected with 401, ending session");
            self.session.logout().await;
            self.navigator.navigate(&self.sign_in_path);
            return Err(AuthError::Http {
                status: status.as_u16(),
                message: error_message(&String::from_utf8_lossy(&body)),
            });
        }

        if !status.is_success() {
            return Err(AuthError::Http {
                status: status.as_u16(),
                message: error_message(&String::from_utf8_lossy(&body)),
            });
        }

        decode_body(&body)
    }
}

/// Default content type, then the bearer token, then caller headers, which
/// override both.
fn merge_headers(token: &str, extra: &[(String, String)]) -> Result<HeaderMap, AuthError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| AuthError::Encode(format!("Invalid access token header: {e}")))?;
    headers.insert(AUTHORIZATION, bearer);

    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AuthError::Encode(format!("Invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| AuthError::Encode(format!("Invalid header value: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// An empty body decodes as JSON `null`, which fits `()` and `Option<T>`.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AuthError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body)
        .map_err(|e| AuthError::Decode(format!("Failed to decode response: {e}")))
}

fn map_request_error(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::Timeout("Request timed out. Please try again.".to_string())
    } else {
        AuthError::Network(format!("Unable to reach the server: {err}"))
    }
}
