//! The client: one context, its storages, and the gateway dispatcher.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::ClientOptions;
use crate::context::ClientContext;
use crate::error::Result;
use crate::events::{ClientEvent, Dispatcher, GatewayFrame};
use crate::storage::{ChannelStorage, GuildStorage, UserStorage};

pub struct Client {
    ctx: Arc<ClientContext>,
    users: Arc<UserStorage>,
    guilds: Arc<GuildStorage>,
    channels: Arc<ChannelStorage>,
    dispatcher: Dispatcher,
}

impl Client {
    /// Build a client. Call from within a tokio runtime for the user sweep
    /// timer to start.
    pub fn new(options: ClientOptions) -> Self {
        let ctx = Arc::new(ClientContext::new(options));
        let users = UserStorage::new(ctx.clone());
        let guilds = Arc::new(GuildStorage::new(ctx.clone(), users.clone()));
        let channels = Arc::new(ChannelStorage::new(ctx.clone()));
        let dispatcher = Dispatcher::with_defaults(&ctx, &users, &guilds, &channels);
        info!("Client ready to receive gateway events");

        Self {
            ctx,
            users,
            guilds,
            channels,
            dispatcher,
        }
    }

    pub fn context(&self) -> &Arc<ClientContext> {
        &self.ctx
    }

    pub fn users(&self) -> &Arc<UserStorage> {
        &self.users
    }

    pub fn guilds(&self) -> &Arc<GuildStorage> {
        &self.guilds
    }

    pub fn channels(&self) -> &Arc<ChannelStorage> {
        &self.channels
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.ctx.events.subscribe()
    }

    pub fn dispatch(&self, event: &str, data: &Value) -> Result<()> {
        self.dispatcher.dispatch(event, data)
    }

    pub fn dispatch_frame(&self, frame: &GatewayFrame) -> Result<()> {
        self.dispatcher.dispatch_frame(frame)
    }

    /// Stop background work. Caches stay readable.
    pub fn shutdown(&self) {
        self.users.stop_sweeper();
        info!("Client shut down");
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}
