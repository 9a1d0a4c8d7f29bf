//! `USER_UPDATE`.

use std::sync::Arc;

use tracing::debug;

use super::{ClientEvent, GatewayHandler, patch_with_snapshot};
use crate::context::ClientContext;
use crate::error::Result;
use crate::models::payload::{self, Payload};
use crate::models::{Entity, User};

/// Patches a cached user in place and emits `userUpdate` with the old state.
pub struct UserUpdate {
    ctx: Arc<ClientContext>,
    clones: bool,
}

impl UserUpdate {
    pub fn new(ctx: Arc<ClientContext>) -> Self {
        let clones = ctx.options.clones_enabled(ClientEvent::USER_UPDATE);
        Self { ctx, clones }
    }
}

impl GatewayHandler for UserUpdate {
    fn handle(&self, data: &Payload) -> Result<()> {
        let id = payload::require_id(data, User::KIND)?;
        let Some(user) = self.ctx.users.get(&id) else {
            debug!("Dropping update for uncached user {}", id);
            return Ok(());
        };

        let old = patch_with_snapshot(&user, data, self.clones)?;
        self.ctx.events.emit(ClientEvent::UserUpdate { user, old });
        Ok(())
    }
}
