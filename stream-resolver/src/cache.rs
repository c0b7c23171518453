use crate::{ContentType, Error, ParsedIdentifier};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Key/value store with per-entry TTL. Values are serialized `StreamResponse`s.
#[async_trait]
pub trait StreamCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, Error>;

    async fn set(&self, key: &CacheKey, value: String, ttl_seconds: u64) -> Result<(), Error>;
}

/// Handle to the process-wide cache store.
pub type SharedCache = Arc<dyn StreamCache>;

/// Cache key for one stream request.
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub struct CacheKey(String);

impl CacheKey {
    /// `stream:movie:{id}`, `stream:series:{id}` or `stream:series:{id}:{season}:{episode}`.
    pub fn for_request(content_type: ContentType, identifier: &ParsedIdentifier) -> Self {
        let base_id = identifier.base_id();
        let key = match (content_type, identifier.episode_pair()) {
            (ContentType::Movie, _) => format!("stream:movie:{}", base_id),
            (ContentType::Series, Some((season, episode))) => {
                format!("stream:series:{}:{}:{}", base_id, season, episode)
            }
            (ContentType::Series, None) => format!("stream:series:{}", base_id),
        };
        CacheKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration for the in-memory store
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    pub max_entries: usize,
    /// Whether caching is enabled. Off when `max_entries` is 0.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            enabled: max_entries > 0,
        }
    }
}

/// Cached payload with metadata
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Utc::now(),
            ttl,
        }
    }

    /// Check if the cached entry is still valid
    pub fn is_valid(&self) -> bool {
        Utc::now() < self.created_at + self.ttl
    }
}

/// In-memory cache implementation using DashMap for thread safety
pub struct MemoryCache {
    entries: DashMap<CacheKey, CachedEntry>,
    config: CacheConfig,
}

impl MemoryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Get cached value if available and valid
    pub fn lookup(&self, key: &CacheKey) -> Option<String> {
        if !self.config.enabled {
            return None;
        }

        let cached = self
            .entries
            .get(key)
            .map(|entry| entry.is_valid().then(|| entry.value.clone()));

        match cached {
            Some(Some(value)) => {
                log::debug!("Cache hit for key: {}", key);
                return Some(value);
            }
            Some(None) => {
                log::debug!("Cache expired for key: {}", key);
                self.entries.remove_if(key, |_, entry| !entry.is_valid());
            }
            None => {}
        }

        log::debug!("Cache miss for key: {}", key);
        None
    }

    /// Store value in cache
    pub fn put(&self, key: CacheKey, value: String, ttl: Duration) {
        if !self.config.enabled {
            return;
        }

        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&key) {
            self.evict_expired();

            // If still at capacity, remove oldest entries
            if self.entries.len() >= self.config.max_entries {
                self.evict_oldest();
            }
        }

        log::debug!("Stored in cache with key: {}", key);
        self.entries.insert(key, CachedEntry::new(value, ttl));
    }

    /// Remove expired entries from cache
    pub fn evict_expired(&self) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_valid());
        log::debug!("Evicted {} expired cache entries", before - self.entries.len());
    }

    /// Remove the oldest quarter of entries when at capacity
    fn evict_oldest(&self) {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().created_at))
            .collect();

        entries.sort_by_key(|(_, created_at)| *created_at);

        let to_remove = (self.config.max_entries / 4).max(1);
        for (key, _) in entries.into_iter().take(to_remove) {
            self.entries.remove(&key);
        }

        log::debug!("Evicted {} oldest cache entries", to_remove);
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let total_entries = self.entries.len();
        let expired_entries = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_valid())
            .count();

        CacheStats {
            total_entries,
            valid_entries: total_entries - expired_entries,
            expired_entries,
            max_entries: self.config.max_entries,
        }
    }
}

#[async_trait]
impl StreamCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, Error> {
        Ok(self.lookup(key))
    }

    async fn set(&self, key: &CacheKey, value: String, ttl_seconds: u64) -> Result<(), Error> {
        let seconds = i64::try_from(ttl_seconds)
            .map_err(|_| Error::Cache(format!("TTL of {} seconds is out of range", ttl_seconds)))?;
        let ttl = Duration::try_seconds(seconds)
            .ok_or_else(|| Error::Cache(format!("TTL of {} seconds is out of range", ttl_seconds)))?;
        self.put(key.clone(), value, ttl);
        Ok(())
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub max_entries: usize,
}
