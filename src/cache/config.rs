//! Presence cache bounds.

use std::time::Duration;

use serde::Deserialize;

/// Bounds for the [`PresenceCache`](super::PresenceCache).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,

    /// Time-to-live for cache entries.
    /// After this duration, entries are automatically evicted.
    #[serde(with = "opt_secs")]
    pub ttl: Option<Duration>,

    /// Time-to-idle for cache entries.
    /// Entries are evicted if not updated or read within this duration.
    #[serde(with = "opt_secs")]
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(Duration::from_secs(300)), // 5 minutes
            tti: None,
        }
    }
}

impl CacheConfig {
    /// Config for presence records.
    /// Presences are refreshed continuously by the gateway, so an entry
    /// that has not been touched for an hour is stale.
    pub fn presences() -> Self {
        Self {
            max_capacity: 50_000,
            ttl: None,
            tti: Some(Duration::from_secs(3600)), // 1 hour idle
        }
    }
}

/// `Option<Duration>` as whole seconds.
mod opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
