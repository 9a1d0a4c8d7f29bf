//! `READY`.

use std::sync::Arc;

use tracing::info;

use super::{ClientEvent, GatewayHandler};
use crate::context::ClientContext;
use crate::error::{CacheError, Result};
use crate::models::payload::{self, Payload};
use crate::storage::{Factory, GuildStorage, UserStorage};

/// Records the connected account and seeds the guild cache with the
/// session's (usually unavailable) guild stubs.
pub struct Ready {
    ctx: Arc<ClientContext>,
    users: Arc<UserStorage>,
    guilds: Arc<GuildStorage>,
}

impl Ready {
    const KIND: &'static str = "ready";

    pub fn new(ctx: Arc<ClientContext>, users: Arc<UserStorage>, guilds: Arc<GuildStorage>) -> Self {
        Self { ctx, users, guilds }
    }
}

impl GatewayHandler for Ready {
    fn handle(&self, data: &Payload) -> Result<()> {
        let user_data = payload::object(data, Self::KIND, "user")?
            .ok_or(CacheError::missing(Self::KIND, "user"))?;
        let stubs: Vec<Payload> = payload::field(data, Self::KIND, "guilds")?.unwrap_or_default();

        let user = self.users.fetched(user_data)?;
        self.ctx.set_client_user_id(user.id());

        for stub in &stubs {
            self.guilds.factory(stub)?;
        }

        info!("Ready as {} with {} guilds", user.read().tag(), stubs.len());
        self.ctx.events.emit(ClientEvent::Ready { user });
        Ok(())
    }
}
