use crate::domain_port::{Cookie, CookieAttributes, SessionStore, StoreError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    attributes: CookieAttributes,
    expire_at: DateTime<Utc>,
}

/// Process-scoped cookie jar. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, MemoryEntry>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attributes(&self, name: &str) -> Option<CookieAttributes> {
        self.entries.get(name).map(|e| e.attributes)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        let now = Utc::now();
        // The shard guard must be released before removing.
        match self.entries.get(name) {
            None => return Ok(None),
            Some(entry) if entry.expire_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }
        self.entries.remove(name);
        Ok(None)
    }

    async fn set(&self, cookie: Cookie) -> Result<(), StoreError> {
        let expire_at = Utc::now() + cookie.attributes.max_age;
        self.entries.insert(
            cookie.name,
            MemoryEntry {
                value: cookie.value,
                attributes: cookie.attributes,
                expire_at,
            },
        );
        Ok(())
    }

    async fn clear(&self, name: &str) -> Result<(), StoreError> {
        self.entries.remove(name);
        Ok(())
    }
}
