//! `CHANNEL_CREATE` and `CHANNEL_UPDATE`.

use std::sync::Arc;

use tracing::debug;

use super::{ClientEvent, GatewayHandler, patch_with_snapshot};
use crate::context::ClientContext;
use crate::error::Result;
use crate::models::payload::{self, Payload};
use crate::models::{Channel, Entity};
use crate::storage::ChannelStorage;

/// Caches the channel under its guild, if the guild is known.
pub struct ChannelCreate {
    ctx: Arc<ClientContext>,
    channels: Arc<ChannelStorage>,
}

impl ChannelCreate {
    pub fn new(ctx: Arc<ClientContext>, channels: Arc<ChannelStorage>) -> Self {
        Self { ctx, channels }
    }
}

impl GatewayHandler for ChannelCreate {
    fn handle(&self, data: &Payload) -> Result<()> {
        let guild = payload::snowflake(data, Channel::KIND, "guild_id")?
            .and_then(|id| self.ctx.guilds.get(&id));
        let channel = self.channels.factory_in(data, guild.as_ref())?;
        self.ctx.events.emit(ClientEvent::ChannelCreate { channel });
        Ok(())
    }
}

pub struct ChannelUpdate {
    ctx: Arc<ClientContext>,
    clones: bool,
}

impl ChannelUpdate {
    pub fn new(ctx: Arc<ClientContext>) -> Self {
        let clones = ctx.options.clones_enabled(ClientEvent::CHANNEL_UPDATE);
        Self { ctx, clones }
    }
}

impl GatewayHandler for ChannelUpdate {
    fn handle(&self, data: &Payload) -> Result<()> {
        let id = payload::require_id(data, Channel::KIND)?;
        let Some(channel) = self.ctx.channels.get(&id) else {
            debug!("Dropping update for uncached channel {}", id);
            return Ok(());
        };

        let old = patch_with_snapshot(&channel, data, self.clones)?;
        self.ctx.events.emit(ClientEvent::ChannelUpdate { channel, old });
        Ok(())
    }
}
