//! Channel storage.

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::Factory;
use crate::cache::{Handle, Resolvable};
use crate::context::ClientContext;
use crate::error::Result;
use crate::models::payload::{self, Payload};
use crate::models::{Channel, Entity, Guild};

pub struct ChannelStorage {
    ctx: Arc<ClientContext>,
}

impl ChannelStorage {
    pub fn new(ctx: Arc<ClientContext>) -> Self {
        Self { ctx }
    }

    pub fn has(&self, key: &str) -> bool {
        self.ctx.channels.has(key)
    }

    pub fn get(&self, key: &str) -> Option<Handle<Channel>> {
        self.ctx.channels.get(key)
    }

    pub fn all(&self) -> Vec<Handle<Channel>> {
        self.ctx.channels.all()
    }

    pub fn resolve(&self, channel: impl Into<Resolvable<Channel>>) -> Result<Handle<Channel>> {
        self.ctx.channels.resolve(channel)
    }

    /// Insert or overwrite a channel.
    pub fn set(&self, key: &str, channel: Handle<Channel>) -> &Self {
        self.ctx.channels.set(key, channel);
        self
    }

    /// Like [`Factory::factory`], for a channel listed inside `guild`.
    ///
    /// Guild payloads omit `guild_id` on their channels; it is filled in
    /// from `guild` unless the payload carries one.
    pub fn factory_in(&self, data: &Payload, guild: Option<&Handle<Guild>>) -> Result<Handle<Channel>> {
        let data = match guild {
            Some(guild) if !data.contains_key("guild_id") => {
                let mut owned = data.clone();
                owned.insert("guild_id".to_string(), Value::String(guild.id()));
                Cow::Owned(owned)
            }
            _ => Cow::Borrowed(data),
        };

        let id = payload::require_id(&data, Channel::KIND)?;
        let (channel, created) = self
            .ctx
            .channels
            .get_or_try_insert_with(&id, || Channel::new(&data).map(Handle::new))?;
        if created {
            debug!("Cached new channel {}", id);
        } else {
            channel.write().patch(&data)?;
        }
        Ok(channel)
    }
}

impl Factory for ChannelStorage {
    type Entity = Channel;

    fn factory(&self, data: &Payload) -> Result<Handle<Channel>> {
        self.factory_in(data, None)
    }
}
