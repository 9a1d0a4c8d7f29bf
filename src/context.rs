//! Shared client context.
//!
//! Holds every cache a storage policy reads or writes, so policies receive
//! their collaborators explicitly instead of reaching for a global client.

use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use tracing::info;

use crate::cache::{Cache, PresenceCache};
use crate::config::ClientOptions;
use crate::events::EventBus;
use crate::models::{Channel, Guild, User};

pub struct ClientContext {
    /// Primary user cache. Scoped user storages mirror their writes here.
    pub users: Arc<Cache<User>>,
    pub guilds: Arc<Cache<Guild>>,
    pub channels: Arc<Cache<Channel>>,
    pub presences: PresenceCache,
    pub events: EventBus,
    pub options: ClientOptions,
    /// Id of the connected account; exempt from sweeps.
    client_user: RwLock<Option<String>>,
    /// Serializes user sweeps against user construction and member
    /// attachment.
    user_policy: ReentrantMutex<()>,
}

impl ClientContext {
    pub fn new(options: ClientOptions) -> Self {
        let ctx = Self {
            users: Arc::new(Cache::new("users")),
            guilds: Arc::new(Cache::new("guilds")),
            channels: Arc::new(Cache::new("channels")),
            presences: PresenceCache::new(&options.presences),
            events: EventBus::new(options.event_capacity),
            options,
            client_user: RwLock::new(None),
            user_policy: ReentrantMutex::new(()),
        };
        info!("Client context initialized");
        ctx
    }

    pub fn client_user_id(&self) -> Option<String> {
        self.client_user.read().clone()
    }

    pub fn set_client_user_id(&self, id: impl Into<String>) {
        *self.client_user.write() = Some(id.into());
    }

    /// Lock held for a whole user sweep and around every user factory or
    /// patch. Reentrant, so a caller already holding it can go through the
    /// user storage.
    pub fn lock_users(&self) -> ReentrantMutexGuard<'_, ()> {
        self.user_policy.lock()
    }

    /// Whether `id` is the connected account.
    pub fn is_client_user(&self, id: &str) -> bool {
        self.client_user.read().as_deref() == Some(id)
    }
}

impl Default for ClientContext {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("users", &self.users.len())
            .field("guilds", &self.guilds.len())
            .field("channels", &self.channels.len())
            .field("client_user", &*self.client_user.read())
            .finish()
    }
}
