//! User model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;
use super::payload::{self, Payload};
use crate::error::Result;

/// How a user entered the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Seen incidentally, e.g. as the author of a message or a guild member.
    #[default]
    Observed,
    /// Requested explicitly. Never swept.
    Fetched,
}

/// Cached gateway user.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub discriminator: Option<String>,
    pub avatar: Option<String>,
    pub bot: bool,
    pub provenance: Provenance,
    /// Derived from the snowflake id.
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Build a user from a full payload. `username` is required.
    pub fn new(data: &Payload, provenance: Provenance) -> Result<Self> {
        let id = payload::require_id(data, Self::KIND)?;
        let username = payload::require(data, Self::KIND, "username")?;
        let mut user = Self {
            created_at: payload::snowflake_timestamp(&id),
            id,
            username,
            discriminator: None,
            avatar: None,
            bot: false,
            provenance,
        };
        user.patch(data)?;
        Ok(user)
    }

    /// Whether the user was requested explicitly.
    pub fn is_fetched(&self) -> bool {
        self.provenance == Provenance::Fetched
    }

    /// `username#discriminator`, or the bare username for migrated accounts.
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if d != "0" => format!("{}#{}", self.username, d),
            _ => self.username.clone(),
        }
    }
}

impl Entity for User {
    const KIND: &'static str = "user";

    fn id(&self) -> &str {
        &self.id
    }

    fn patch(&mut self, data: &Payload) -> Result<()> {
        let username: Option<String> = payload::field(data, Self::KIND, "username")?;
        let discriminator: Option<Option<String>> = payload::field(data, Self::KIND, "discriminator")?;
        let avatar: Option<Option<String>> = payload::field(data, Self::KIND, "avatar")?;
        let bot: Option<bool> = payload::field(data, Self::KIND, "bot")?;

        if let Some(username) = username {
            self.username = username;
        }
        if let Some(discriminator) = discriminator {
            self.discriminator = discriminator;
        }
        if let Some(avatar) = avatar {
            self.avatar = avatar;
        }
        if let Some(bot) = bot {
            self.bot = bot;
        }
        Ok(())
    }
}
