//! Shared request plumbing for the auth endpoints and the request gateway:
//! URL joining, client construction and error-body extraction.

use serde_json::Value;
use std::time::Duration;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Maximum number of error body characters kept in error messages.
const MAX_ERROR_CHARS: usize = 200;

pub fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Joins the configured API base and a request path with exactly one slash.
pub fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Pulls a human-readable message out of an error body. JSON bodies with a
/// `message` or `statusMessage` field win; anything else is trimmed and
/// truncated.
pub fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["message", "statusMessage"] {
            if let Some(message) = json[key].as_str() {
                return truncate(message);
            }
        }
    }
    truncate(body)
}

fn truncate(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
