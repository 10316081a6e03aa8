use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api: Api,
    pub auth: Auth,
    pub session: Session,
    pub log: Log,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    pub backend: String, // "http" or "fake"
    pub sign_in_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub backend: String, // "memory" or "file"
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment overrides look like `GATEKEEPER__API__BASE`.
const ENV_PREFIX: &str = "GATEKEEPER";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .set_default("api.timeout_ms", 10_000)
        .map_err(|e| anyhow!(e))?
        .set_default("auth.backend", "http")
        .map_err(|e| anyhow!(e))?
        .set_default("auth.sign_in_path", "/auth/signin")
        .map_err(|e| anyhow!(e))?
        .set_default("session.backend", "memory")
        .map_err(|e| anyhow!(e))?
        .set_default("session.path", ".gatekeeper/session.json")
        .map_err(|e| anyhow!(e))?
        .set_default("log.filter", "info")
        .map_err(|e| anyhow!(e))?
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
