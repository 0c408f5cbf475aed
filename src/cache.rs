use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::store::{RuleRecord, ScrapedPost, TrendingSound};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

pub struct TtlCache<V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let guard = self.entries.read().await;
        let entry = guard.get(key)?;
        if self.clock.now() >= entry.expires_at {
            return None;
        }
        Some(entry.value.clone())
    }

    pub async fn set(&self, key: &str, value: V) {
        let now = self.clock.now();
        let mut guard = self.entries.write().await;
        guard.retain(|_, entry| entry.expires_at > now);
        guard.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }
}

pub struct EngineCaches {
    pub rules: TtlCache<Vec<RuleRecord>>,
    pub sounds: TtlCache<Vec<TrendingSound>>,
    pub posts: TtlCache<Vec<ScrapedPost>>,
}

impl EngineCaches {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            rules: TtlCache::new(Duration::from_secs(config.rules_ttl_secs), clock.clone()),
            sounds: TtlCache::new(Duration::from_secs(config.sounds_ttl_secs), clock.clone()),
            posts: TtlCache::new(Duration::from_secs(config.posts_ttl_secs), clock),
        }
    }
}
