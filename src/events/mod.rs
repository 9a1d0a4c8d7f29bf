//! Gateway event handling.
//!
//! Add new event handlers by:
//! 1. Creating a new file in this directory
//! 2. Adding `mod your_event;` below
//! 3. Registering the handler in `Dispatcher::with_defaults()`

mod bus;
mod channel;
mod guild;
mod member;
mod presence;
mod ready;
mod user;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::Handle;
use crate::context::ClientContext;
use crate::error::{CacheError, Result};
use crate::models::{Entity, Payload};
use crate::storage::{ChannelStorage, GuildStorage, UserStorage};

pub use bus::{ClientEvent, EventBus};
pub use channel::{ChannelCreate, ChannelUpdate};
pub use guild::{GuildCreate, GuildUpdate};
pub use member::GuildMemberUpdate;
pub use presence::PresenceUpdate;
pub use ready::Ready;
pub use user::UserUpdate;

/// Consumes one inbound payload for a single gateway event name.
///
/// Errors are not swallowed here; the caller decides whether to continue
/// with the next frame.
pub trait GatewayHandler: Send + Sync {
    fn handle(&self, data: &Payload) -> Result<()>;
}

/// One framed gateway dispatch, `{"t": "GUILD_UPDATE", "d": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayFrame {
    pub t: String,
    #[serde(default)]
    pub d: Value,
}

/// Routes gateway event names to their handlers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<&'static str, Box<dyn GatewayHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher with every built-in handler registered.
    pub fn with_defaults(
        ctx: &Arc<ClientContext>,
        users: &Arc<UserStorage>,
        guilds: &Arc<GuildStorage>,
        channels: &Arc<ChannelStorage>,
    ) -> Self {
        let mut dispatcher = Self::new();
        dispatcher
            .register("READY", Ready::new(ctx.clone(), users.clone(), guilds.clone()))
            .register("GUILD_CREATE", GuildCreate::new(ctx.clone(), guilds.clone(), channels.clone()))
            .register("CHANNEL_CREATE", ChannelCreate::new(ctx.clone(), channels.clone()))
            .register("GUILD_UPDATE", GuildUpdate::new(ctx.clone()))
            .register("USER_UPDATE", UserUpdate::new(ctx.clone()))
            .register("CHANNEL_UPDATE", ChannelUpdate::new(ctx.clone()))
            .register("GUILD_MEMBER_UPDATE", GuildMemberUpdate::new(ctx.clone(), users.clone()))
            .register("PRESENCE_UPDATE", PresenceUpdate::new(ctx.clone(), users.clone()));
        dispatcher
    }

    /// Register or replace the handler for `event`.
    pub fn register(&mut self, event: &'static str, handler: impl GatewayHandler + 'static) -> &mut Self {
        self.handlers.insert(event, Box::new(handler));
        self
    }

    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Handle one event. Unknown event names are ignored.
    pub fn dispatch(&self, event: &str, data: &Value) -> Result<()> {
        let Some(handler) = self.handlers.get(event) else {
            debug!("Ignoring unhandled gateway event {}", event);
            return Ok(());
        };
        let Value::Object(payload) = data else {
            return Err(CacheError::MalformedPayload {
                event: event.to_string(),
            });
        };
        handler.handle(payload)
    }

    pub fn dispatch_frame(&self, frame: &GatewayFrame) -> Result<()> {
        self.dispatch(&frame.t, &frame.d)
    }
}

/// Patch `entity` in place, first taking a snapshot if `clones` is set.
///
/// Snapshot and patch happen under one write lock, so no reader sees a
/// half-patched entity and the snapshot is exactly the pre-patch state.
pub(crate) fn patch_with_snapshot<E: Entity>(
    entity: &Handle<E>,
    data: &Payload,
    clones: bool,
) -> Result<Option<Arc<E>>> {
    let mut entity = entity.write();
    let old = clones.then(|| Arc::new(entity.clone()));
    entity.patch(data)?;
    Ok(old)
}
