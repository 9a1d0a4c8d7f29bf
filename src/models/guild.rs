//! Guild model.

use super::payload::{self, Payload};
use super::{Entity, GuildMember};
use crate::cache::Cache;
use crate::error::Result;

/// Cached guild.
///
/// Cloning deep-copies the member list, so a clone taken before a patch
/// keeps showing the old members.
#[derive(Clone, Debug)]
pub struct Guild {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub owner_id: Option<String>,
    pub region: Option<String>,
    pub member_count: u64,
    pub large: bool,
    /// Set while the guild is in an outage.
    pub unavailable: bool,
    /// Members keyed by user id.
    pub members: Cache<GuildMember>,
}

impl Guild {
    /// Build a guild. `name` is required unless the payload marks the guild
    /// unavailable, in which case only the id is known.
    pub fn new(data: &Payload) -> Result<Self> {
        let id = payload::require_id(data, Self::KIND)?;
        let unavailable = payload::flag(data, Self::KIND, "unavailable")?.unwrap_or(false);
        let name: String = if unavailable {
            payload::field(data, Self::KIND, "name")?.unwrap_or_default()
        } else {
            payload::require(data, Self::KIND, "name")?
        };

        let mut guild = Self {
            members: Cache::new(format!("guild:{id}:members")),
            id,
            name,
            icon: None,
            owner_id: None,
            region: None,
            member_count: 0,
            large: false,
            unavailable,
        };
        guild.patch(data)?;
        Ok(guild)
    }

    /// Ids of every cached member.
    pub fn member_ids(&self) -> Vec<String> {
        self.members.keys()
    }
}

impl Entity for Guild {
    const KIND: &'static str = "guild";

    fn id(&self) -> &str {
        &self.id
    }

    /// Scalar guild fields. The `members` array is materialised by the guild
    /// storage, which owns user identity.
    fn patch(&mut self, data: &Payload) -> Result<()> {
        let name: Option<String> = payload::field(data, Self::KIND, "name")?;
        let icon: Option<Option<String>> = payload::field(data, Self::KIND, "icon")?;
        let owner_id = payload::snowflake(data, Self::KIND, "owner_id")?;
        let region: Option<Option<String>> = payload::field(data, Self::KIND, "region")?;
        let member_count: Option<u64> = payload::field(data, Self::KIND, "member_count")?;
        let large: Option<bool> = payload::field(data, Self::KIND, "large")?;
        let unavailable = payload::flag(data, Self::KIND, "unavailable")?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(icon) = icon {
            self.icon = icon;
        }
        if owner_id.is_some() {
            self.owner_id = owner_id;
        }
        if let Some(region) = region {
            self.region = region;
        }
        if let Some(member_count) = member_count {
            self.member_count = member_count;
        }
        if let Some(large) = large {
            self.large = large;
        }
        if let Some(unavailable) = unavailable {
            self.unavailable = unavailable;
        }
        Ok(())
    }
}
