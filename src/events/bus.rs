//! Client event fan-out to subscribers.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use crate::cache::Handle;
use crate::models::{Channel, Guild, GuildMember, Presence, User};

/// Events emitted after the cache has been brought up to date.
///
/// `old` values are immutable snapshots taken before the patch, present only
/// when snapshotting is enabled for that event kind.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Ready {
        user: Handle<User>,
    },
    GuildCreate {
        guild: Handle<Guild>,
    },
    GuildUnavailable {
        guild: Handle<Guild>,
    },
    GuildUpdate {
        guild: Handle<Guild>,
        old: Option<Arc<Guild>>,
    },
    UserUpdate {
        user: Handle<User>,
        old: Option<Arc<User>>,
    },
    ChannelCreate {
        channel: Handle<Channel>,
    },
    ChannelUpdate {
        channel: Handle<Channel>,
        old: Option<Arc<Channel>>,
    },
    GuildMemberUpdate {
        member: Handle<GuildMember>,
        old: Option<Arc<GuildMember>>,
    },
    PresenceUpdate {
        presence: Presence,
        old: Option<Presence>,
    },
}

impl ClientEvent {
    pub const READY: &'static str = "ready";
    pub const GUILD_CREATE: &'static str = "guildCreate";
    pub const GUILD_UNAVAILABLE: &'static str = "guildUnavailable";
    pub const GUILD_UPDATE: &'static str = "guildUpdate";
    pub const USER_UPDATE: &'static str = "userUpdate";
    pub const CHANNEL_CREATE: &'static str = "channelCreate";
    pub const CHANNEL_UPDATE: &'static str = "channelUpdate";
    pub const GUILD_MEMBER_UPDATE: &'static str = "guildMemberUpdate";
    pub const PRESENCE_UPDATE: &'static str = "presenceUpdate";

    /// Event kind name, as used by `disableClones`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => Self::READY,
            Self::GuildCreate { .. } => Self::GUILD_CREATE,
            Self::GuildUnavailable { .. } => Self::GUILD_UNAVAILABLE,
            Self::GuildUpdate { .. } => Self::GUILD_UPDATE,
            Self::UserUpdate { .. } => Self::USER_UPDATE,
            Self::ChannelCreate { .. } => Self::CHANNEL_CREATE,
            Self::ChannelUpdate { .. } => Self::CHANNEL_UPDATE,
            Self::GuildMemberUpdate { .. } => Self::GUILD_MEMBER_UPDATE,
            Self::PresenceUpdate { .. } => Self::PRESENCE_UPDATE,
        }
    }
}

/// Fire-and-forget broadcast of [`ClientEvent`]s.
///
/// Cloning is cheap and shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver to every current subscriber.
    pub fn emit(&self, event: ClientEvent) {
        trace!("Emitting {}", event.name());
        // No subscribers is fine; nobody is listening for this event.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }
}
