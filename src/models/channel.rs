//! Channel model.

use serde::Serialize;

use super::Entity;
use super::payload::{self, Payload};
use crate::error::Result;

#[derive(Clone, Debug, Serialize)]
pub struct Channel {
    pub id: String,
    /// Gateway channel type (0 = text, 2 = voice, ...).
    pub kind: u8,
    pub name: Option<String>,
    pub guild_id: Option<String>,
    pub topic: Option<String>,
    pub position: i64,
    pub nsfw: bool,
}

impl Channel {
    pub fn new(data: &Payload) -> Result<Self> {
        let mut channel = Self {
            id: payload::require_id(data, Self::KIND)?,
            kind: payload::require(data, Self::KIND, "type")?,
            name: None,
            guild_id: None,
            topic: None,
            position: 0,
            nsfw: false,
        };
        channel.patch(data)?;
        Ok(channel)
    }
}

impl Entity for Channel {
    const KIND: &'static str = "channel";

    fn id(&self) -> &str {
        &self.id
    }

    fn patch(&mut self, data: &Payload) -> Result<()> {
        let kind: Option<u8> = payload::field(data, Self::KIND, "type")?;
        let name: Option<Option<String>> = payload::field(data, Self::KIND, "name")?;
        let guild_id = payload::snowflake(data, Self::KIND, "guild_id")?;
        let topic: Option<Option<String>> = payload::field(data, Self::KIND, "topic")?;
        let position: Option<i64> = payload::field(data, Self::KIND, "position")?;
        let nsfw: Option<bool> = payload::field(data, Self::KIND, "nsfw")?;

        if let Some(kind) = kind {
            self.kind = kind;
        }
        if let Some(name) = name {
            self.name = name;
        }
        if guild_id.is_some() {
            self.guild_id = guild_id;
        }
        if let Some(topic) = topic {
            self.topic = topic;
        }
        if let Some(position) = position {
            self.position = position;
        }
        if let Some(nsfw) = nsfw {
            self.nsfw = nsfw;
        }
        Ok(())
    }
}
