//! `GUILD_MEMBER_UPDATE`.

use std::sync::Arc;

use tracing::debug;

use super::{ClientEvent, GatewayHandler, patch_with_snapshot};
use crate::context::ClientContext;
use crate::error::{CacheError, Result};
use crate::models::payload::{self, Payload};
use crate::models::{Entity, GuildMember};
use crate::storage::UserStorage;

/// Patches the embedded user through the user storage, then the member
/// itself. Updates for uncached guilds or members are dropped after the
/// user patch.
pub struct GuildMemberUpdate {
    ctx: Arc<ClientContext>,
    users: Arc<UserStorage>,
    clones: bool,
}

impl GuildMemberUpdate {
    pub fn new(ctx: Arc<ClientContext>, users: Arc<UserStorage>) -> Self {
        let clones = ctx.options.clones_enabled(ClientEvent::GUILD_MEMBER_UPDATE);
        Self { ctx, users, clones }
    }
}

impl GatewayHandler for GuildMemberUpdate {
    fn handle(&self, data: &Payload) -> Result<()> {
        let guild_id = payload::require_snowflake(data, GuildMember::KIND, "guild_id")?;
        let user_data = payload::object(data, GuildMember::KIND, "user")?
            .ok_or(CacheError::missing(GuildMember::KIND, "user"))?;
        let user_id = payload::require_id(user_data, GuildMember::KIND)?;

        self.users.patch(user_data)?;

        let Some(guild) = self.ctx.guilds.get(&guild_id) else {
            debug!("Dropping member update for uncached guild {}", guild_id);
            return Ok(());
        };
        let Some(member) = guild.read().members.get(&user_id) else {
            debug!("Dropping update for uncached member {} of {}", user_id, guild_id);
            return Ok(());
        };

        let old = patch_with_snapshot(&member, data, self.clones)?;
        self.ctx.events.emit(ClientEvent::GuildMemberUpdate { member, old });
        Ok(())
    }
}
