//! Bounded presence store backed by Moka.

use moka::sync::Cache as Moka;

use super::CacheConfig;
use crate::models::Presence;

/// Latest presence per user id.
///
/// Presences are cheap to lose: the gateway resends them, so entries may
/// fall out under capacity or idle pressure. Unlike the entity caches this
/// hands out copies, never shared handles.
pub struct PresenceCache {
    inner: Moka<String, Presence>,
}

impl PresenceCache {
    pub fn new(config: &CacheConfig) -> Self {
        let mut builder = Moka::builder()
            .name("presences")
            .max_capacity(config.max_capacity);

        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }

        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        Self {
            inner: builder.build(),
        }
    }

    pub fn get(&self, user_id: &str) -> Option<Presence> {
        self.inner.get(user_id)
    }

    /// Store `presence` for its user, returning the one it replaced.
    ///
    /// Read and write happen as one step, so concurrent updates for the same
    /// user each see the presence the other replaced.
    pub fn replace(&self, presence: Presence) -> Option<Presence> {
        let mut previous = None;
        self.inner
            .entry(presence.user_id.clone())
            .and_upsert_with(|existing| {
                previous = existing.map(|entry| entry.into_value());
                presence
            });
        previous
    }

    /// Drop the presence for `user_id`. No-op if absent.
    pub fn invalidate(&self, user_id: &str) {
        self.inner.invalidate(user_id);
    }
}

impl std::fmt::Debug for PresenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceCache")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}
