use crate::domain_port::{Cookie, CookieAttributes, SessionStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileEntry {
    value: String,
    attributes: CookieAttributes,
    expire_at: DateTime<Utc>,
}

type Jar = BTreeMap<String, FileEntry>;

/// Cookie jar persisted as JSON, so a CLI session outlives the process.
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Jar, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Jar::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, jar: &Jar) -> Result<(), StoreError> {
        if jar.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes =
            serde_json::to_vec_pretty(jar).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        // Readers see either the old jar or the new one, never a partial write.
        let staging = self.staging_path();
        if let Err(e) = write_private(&staging, &bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        debug!("session written to {}", self.path.display());
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }
}

/// Creates `path` readable by the owner only and writes `bytes` to it.
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[async_trait::async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut jar = self.load().await?;
        let now = Utc::now();

        match jar.get(name) {
            None => Ok(None),
            Some(entry) if entry.expire_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                jar.remove(name);
                self.save(&jar).await?;
                Ok(None)
            }
        }
    }

    async fn set(&self, cookie: Cookie) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut jar = self.load().await?;
        let expire_at = Utc::now() + cookie.attributes.max_age;
        jar.insert(
            cookie.name,
            FileEntry {
                value: cookie.value,
                attributes: cookie.attributes,
                expire_at,
            },
        );
        self.save(&jar).await
    }

    async fn clear(&self, name: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut jar = self.load().await?;
        if jar.remove(name).is_some() {
            self.save(&jar).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
    use std::time::Duration;

    #[tokio::test]
    async fn survives_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileSessionStore::new(&path);
        store.set(Cookie::access_token("a1")).await.unwrap();
        store.set(Cookie::refresh_token("r1")).await.unwrap();

        let reopened = FileSessionStore::new(&path);
        assert_eq!(
            reopened.get(ACCESS_TOKEN_COOKIE).await.unwrap(),
            Some("a1".to_string())
        );
        assert_eq!(
            reopened.get(REFRESH_TOKEN_COOKIE).await.unwrap(),
            Some("r1".to_string())
        );
    }

    #[tokio::test]
    async fn clearing_everything_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let store = FileSessionStore::new(&path);

        store.set(Cookie::access_token("a1")).await.unwrap();
        assert!(path.exists());

        store.clear(ACCESS_TOKEN_COOKIE).await.unwrap();
        assert!(!path.exists());
        assert_eq!(store.get(ACCESS_TOKEN_COOKIE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_cookie_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        store
            .set(Cookie {
                name: ACCESS_TOKEN_COOKIE.to_string(),
                value: "a".to_string(),
                attributes: CookieAttributes::strict(Duration::ZERO),
            })
            .await
            .unwrap();

        assert_eq!(store.get(ACCESS_TOKEN_COOKIE).await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn jar_is_private_to_the_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileSessionStore::new(&path);
        store.set(Cookie::refresh_token("r1")).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn writes_leave_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileSessionStore::new(&path);

        store.set(Cookie::access_token("a1")).await.unwrap();
        store.set(Cookie::refresh_token("r1")).await.unwrap();
        store.set(Cookie::access_token("a2")).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("session.json")]);
        assert_eq!(
            store.get(ACCESS_TOKEN_COOKIE).await.unwrap(),
            Some("a2".to_string())
        );
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = FileSessionStore::new(&path);
        assert!(matches!(
            store.get(ACCESS_TOKEN_COOKIE).await,
            Err(StoreError::Corrupt(_))
        ));
    }
}
