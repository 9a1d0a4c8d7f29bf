//! Guild storage.

use std::sync::Arc;

use tracing::debug;

use super::{Factory, UserStorage};
use crate::cache::{Handle, Resolvable};
use crate::context::ClientContext;
use crate::error::{CacheError, Result};
use crate::models::payload::{self, Payload};
use crate::models::{Entity, Guild, GuildMember};

/// Builds guilds and their members. Member users go through the user
/// storage so each member shares the canonical user instance.
pub struct GuildStorage {
    ctx: Arc<ClientContext>,
    users: Arc<UserStorage>,
}

impl GuildStorage {
    pub fn new(ctx: Arc<ClientContext>, users: Arc<UserStorage>) -> Self {
        Self { ctx, users }
    }

    pub fn has(&self, key: &str) -> bool {
        self.ctx.guilds.has(key)
    }

    pub fn get(&self, key: &str) -> Option<Handle<Guild>> {
        self.ctx.guilds.get(key)
    }

    pub fn all(&self) -> Vec<Handle<Guild>> {
        self.ctx.guilds.all()
    }

    pub fn resolve(&self, guild: impl Into<Resolvable<Guild>>) -> Result<Handle<Guild>> {
        self.ctx.guilds.resolve(guild)
    }

    /// Get-or-create a member of `guild` from a member payload with an
    /// embedded `user` object.
    ///
    /// The user lock is held until the member is attached, so a sweep never
    /// sees the user without the membership that keeps it live.
    pub fn member_factory(&self, guild: &Handle<Guild>, data: &Payload) -> Result<Handle<GuildMember>> {
        let _policy = self.ctx.lock_users();
        let user_data = payload::object(data, GuildMember::KIND, "user")?
            .ok_or(CacheError::missing(GuildMember::KIND, "user"))?;
        let user = self.users.factory(user_data)?;
        let user_id = user.id();

        let guild = guild.read();
        let (member, created) = guild.members.get_or_try_insert_with(&user_id, || {
            GuildMember::new(guild.id.as_str(), user, data).map(Handle::new)
        })?;
        if !created {
            member.write().patch(data)?;
        }
        Ok(member)
    }
}

impl Factory for GuildStorage {
    type Entity = Guild;

    /// Also materialises the payload's `members` array, if any.
    fn factory(&self, data: &Payload) -> Result<Handle<Guild>> {
        let id = payload::require_id(data, Guild::KIND)?;
        // Parse members up front so a malformed array leaves no new guild behind.
        let members: Option<Vec<Payload>> = payload::field(data, Guild::KIND, "members")?;

        let (guild, created) = self
            .ctx
            .guilds
            .get_or_try_insert_with(&id, || Guild::new(data).map(Handle::new))?;
        if created {
            debug!("Cached new guild {}", id);
        } else {
            guild.write().patch(data)?;
        }

        for member in members.iter().flatten() {
            self.member_factory(&guild, member)?;
        }
        Ok(guild)
    }
}
