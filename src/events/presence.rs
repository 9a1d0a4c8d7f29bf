//! `PRESENCE_UPDATE`.

use std::sync::Arc;

use super::{ClientEvent, GatewayHandler};
use crate::context::ClientContext;
use crate::error::{CacheError, Result};
use crate::models::payload::{self, Payload};
use crate::models::Presence;
use crate::storage::UserStorage;

/// Stores the new presence and emits `presenceUpdate`. The embedded user
/// payload is applied to the cached user when there is one.
pub struct PresenceUpdate {
    ctx: Arc<ClientContext>,
    users: Arc<UserStorage>,
    clones: bool,
}

impl PresenceUpdate {
    pub fn new(ctx: Arc<ClientContext>, users: Arc<UserStorage>) -> Self {
        let clones = ctx.options.clones_enabled(ClientEvent::PRESENCE_UPDATE);
        Self { ctx, users, clones }
    }
}

impl GatewayHandler for PresenceUpdate {
    fn handle(&self, data: &Payload) -> Result<()> {
        let presence = Presence::from_payload(data)?;
        let user_data = payload::object(data, "presence", "user")?
            .ok_or(CacheError::missing("presence", "user"))?;
        self.users.patch(user_data)?;

        let previous = self.ctx.presences.replace(presence.clone());
        let old = if self.clones { previous } else { None };
        self.ctx.events.emit(ClientEvent::PresenceUpdate { presence, old });
        Ok(())
    }
}
