//! Guild member model.

use chrono::{DateTime, Utc};

use super::payload::{self, Payload};
use super::{Entity, User};
use crate::cache::{Handle, Related, Resolvable};
use crate::error::Result;

/// A user's membership in one guild. Keyed by the user's id.
#[derive(Clone, Debug)]
pub struct GuildMember {
    pub id: String,
    pub guild_id: String,
    /// The canonical user instance, shared with the user cache.
    pub user: Handle<User>,
    pub nick: Option<String>,
    pub roles: Vec<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub deaf: bool,
    pub mute: bool,
}

impl GuildMember {
    pub fn new(guild_id: impl Into<String>, user: Handle<User>, data: &Payload) -> Result<Self> {
        let mut member = Self {
            id: user.id(),
            guild_id: guild_id.into(),
            user,
            nick: None,
            roles: Vec::new(),
            joined_at: None,
            deaf: false,
            mute: false,
        };
        member.patch(data)?;
        Ok(member)
    }

    /// Nickname if set, otherwise the username.
    pub fn display_name(&self) -> String {
        self.nick
            .clone()
            .unwrap_or_else(|| self.user.read().username.clone())
    }
}

impl Entity for GuildMember {
    const KIND: &'static str = "member";

    fn id(&self) -> &str {
        &self.id
    }

    /// Member-level fields only; the embedded `user` is patched through the
    /// user storage.
    fn patch(&mut self, data: &Payload) -> Result<()> {
        let nick: Option<Option<String>> = payload::field(data, Self::KIND, "nick")?;
        let roles: Option<Vec<String>> = payload::field(data, Self::KIND, "roles")?;
        let joined_at: Option<Option<DateTime<Utc>>> = payload::field(data, Self::KIND, "joined_at")?;
        let deaf: Option<bool> = payload::field(data, Self::KIND, "deaf")?;
        let mute: Option<bool> = payload::field(data, Self::KIND, "mute")?;

        if let Some(nick) = nick {
            self.nick = nick;
        }
        if let Some(roles) = roles {
            self.roles = roles;
        }
        if let Some(joined_at) = joined_at {
            self.joined_at = joined_at;
        }
        if let Some(deaf) = deaf {
            self.deaf = deaf;
        }
        if let Some(mute) = mute {
            self.mute = mute;
        }
        Ok(())
    }
}

impl Related<User> for Handle<GuildMember> {
    fn related(&self) -> Handle<User> {
        self.read().user.clone()
    }
}

impl From<Handle<GuildMember>> for Resolvable<User> {
    fn from(member: Handle<GuildMember>) -> Self {
        Resolvable::ByRelated(Box::new(member))
    }
}
