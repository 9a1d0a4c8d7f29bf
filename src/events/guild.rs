//! `GUILD_CREATE` and `GUILD_UPDATE`.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{ClientEvent, GatewayHandler, patch_with_snapshot};
use crate::context::ClientContext;
use crate::error::Result;
use crate::models::payload::{self, Payload};
use crate::models::{Entity, Guild};
use crate::storage::{ChannelStorage, Factory, GuildStorage};

/// Caches the guild with its members and channels, then announces it.
pub struct GuildCreate {
    ctx: Arc<ClientContext>,
    guilds: Arc<GuildStorage>,
    channels: Arc<ChannelStorage>,
}

impl GuildCreate {
    pub fn new(ctx: Arc<ClientContext>, guilds: Arc<GuildStorage>, channels: Arc<ChannelStorage>) -> Self {
        Self { ctx, guilds, channels }
    }
}

impl GatewayHandler for GuildCreate {
    fn handle(&self, data: &Payload) -> Result<()> {
        let unavailable = payload::flag(data, Guild::KIND, "unavailable")?.unwrap_or(false);
        let channels: Vec<Payload> = payload::field::<Option<Vec<Payload>>>(data, Guild::KIND, "channels")?
            .flatten()
            .unwrap_or_default();

        let guild = self.guilds.factory(data)?;
        // A full create for a READY stub means the guild came back.
        guild.write().patch(&availability(unavailable))?;

        for channel in &channels {
            self.channels.factory_in(channel, Some(&guild))?;
        }
        self.ctx.events.emit(ClientEvent::GuildCreate { guild });
        Ok(())
    }
}

fn availability(unavailable: bool) -> Payload {
    let mut data = Payload::new();
    data.insert("unavailable".to_string(), Value::Bool(unavailable));
    data
}

/// Patches a cached guild.
///
/// An `unavailable: true` payload only flips the flag and emits
/// `guildUnavailable`; anything else is a full patch followed by
/// `guildUpdate`. Updates for guilds not in the cache are dropped.
pub struct GuildUpdate {
    ctx: Arc<ClientContext>,
    clones: bool,
}

impl GuildUpdate {
    pub fn new(ctx: Arc<ClientContext>) -> Self {
        let clones = ctx.options.clones_enabled(ClientEvent::GUILD_UPDATE);
        Self { ctx, clones }
    }
}

impl GatewayHandler for GuildUpdate {
    fn handle(&self, data: &Payload) -> Result<()> {
        let id = payload::require_id(data, Guild::KIND)?;
        let Some(guild) = self.ctx.guilds.get(&id) else {
            debug!("Dropping update for uncached guild {}", id);
            return Ok(());
        };

        let unavailable = payload::flag(data, Guild::KIND, "unavailable")?.unwrap_or(false);
        if unavailable {
            guild.write().patch(&availability(true))?;
            self.ctx.events.emit(ClientEvent::GuildUnavailable { guild });
            return Ok(());
        }

        let old = patch_with_snapshot(&guild, data, self.clones)?;
        self.ctx.events.emit(ClientEvent::GuildUpdate { guild, old });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Handle;
    use crate::config::{ClientOptions, DisableClones};
    use crate::models::payload::from_json;
    use crate::storage::UserStorage;
    use serde_json::json;
    use tokio::sync::broadcast::Receiver;

    fn setup(disable_clones: DisableClones) -> (Arc<ClientContext>, GuildUpdate, Receiver<ClientEvent>) {
        let ctx = Arc::new(ClientContext::new(ClientOptions {
            disable_clones,
            ..Default::default()
        }));
        let users = UserStorage::new(ctx.clone());
        let guilds = Arc::new(GuildStorage::new(ctx.clone(), users));
        guilds
            .factory(&from_json(json!({
                "id": "G1",
                "name": "Before",
                "region": "eu",
                "members": [{ "user": { "id": "1", "username": "alice" } }]
            })))
            .unwrap();
        let rx = ctx.events.subscribe();
        (ctx.clone(), GuildUpdate::new(ctx), rx)
    }

    #[test]
    fn test_unavailable_short_circuits() {
        let (ctx, handler, mut rx) = setup(DisableClones::None);

        handler
            .handle(&from_json(json!({ "id": "G1", "unavailable": true, "name": "Ignored" })))
            .unwrap();

        let guild = ctx.guilds.get("G1").unwrap();
        assert!(guild.read().unavailable);
        assert_eq!(guild.read().name, "Before");

        match rx.try_recv().unwrap() {
            ClientEvent::GuildUnavailable { guild: emitted } => assert!(Handle::ptr_eq(&emitted, &guild)),
            other => panic!("unexpected event {}", other.name()),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_update_with_snapshot() {
        let (ctx, handler, mut rx) = setup(DisableClones::None);

        handler
            .handle(&from_json(json!({ "id": "G1", "name": "After", "unavailable": false })))
            .unwrap();

        match rx.try_recv().unwrap() {
            ClientEvent::GuildUpdate { guild, old } => {
                let old = old.expect("snapshot enabled by default");
                assert_eq!(old.name, "Before");
                assert_eq!(guild.read().name, "After");
                // Unchanged fields match.
                assert_eq!(old.region, guild.read().region);
                assert_eq!(old.member_ids(), vec!["1"]);
                assert!(Handle::ptr_eq(&guild, &ctx.guilds.get("G1").unwrap()));
            }
            other => panic!("unexpected event {}", other.name()),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_snapshot_is_detached_from_members() {
        let (ctx, handler, mut rx) = setup(DisableClones::None);
        handler.handle(&from_json(json!({ "id": "G1", "name": "After" }))).unwrap();

        let ClientEvent::GuildUpdate { old: Some(old), .. } = rx.try_recv().unwrap() else {
            panic!("expected guildUpdate with snapshot");
        };
        ctx.guilds.get("G1").unwrap().read().members.delete("1");
        assert_eq!(old.member_ids(), vec!["1"]);
    }

    #[test]
    fn test_update_without_snapshot_when_disabled() {
        for disable in [DisableClones::only(["guildUpdate"]), DisableClones::All] {
            let (ctx, handler, mut rx) = setup(disable);
            handler.handle(&from_json(json!({ "id": "G1", "name": "After" }))).unwrap();

            match rx.try_recv().unwrap() {
                ClientEvent::GuildUpdate { old, .. } => assert!(old.is_none()),
                other => panic!("unexpected event {}", other.name()),
            }
            assert_eq!(ctx.guilds.get("G1").unwrap().read().name, "After");
        }
    }

    #[test]
    fn test_other_kinds_do_not_disable_guild_snapshots() {
        let (_ctx, handler, mut rx) = setup(DisableClones::only(["userUpdate"]));
        handler.handle(&from_json(json!({ "id": "G1", "name": "After" }))).unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            ClientEvent::GuildUpdate { old: Some(_), .. }
        ));
    }

    #[test]
    fn test_absent_target_is_noop() {
        let (ctx, handler, mut rx) = setup(DisableClones::None);
        handler
            .handle(&from_json(json!({ "id": "G2", "name": "Other", "unavailable": true })))
            .unwrap();

        assert!(rx.try_recv().is_err());
        assert!(!ctx.guilds.has("G2"));
        assert_eq!(ctx.guilds.len(), 1);
    }

    #[test]
    fn test_malformed_payload_surfaces() {
        let (ctx, handler, mut rx) = setup(DisableClones::None);

        assert!(handler.handle(&from_json(json!({ "name": "x" }))).is_err());
        assert!(handler.handle(&from_json(json!({ "id": "G1", "member_count": "many" }))).is_err());

        assert!(rx.try_recv().is_err());
        assert_eq!(ctx.guilds.get("G1").unwrap().read().member_count, 0);
    }

    #[test]
    fn test_null_unavailable_reads_as_available() {
        let (ctx, handler, mut rx) = setup(DisableClones::None);

        handler
            .handle(&from_json(json!({ "id": "G1", "name": "After", "unavailable": null })))
            .unwrap();

        assert_eq!(rx.try_recv().unwrap().name(), "guildUpdate");
        let guild = ctx.guilds.get("G1").unwrap();
        assert!(!guild.read().unavailable);
        assert_eq!(guild.read().name, "After");
    }

    fn create_handler() -> (Arc<ClientContext>, GuildCreate) {
        let ctx = Arc::new(ClientContext::default());
        let users = UserStorage::new(ctx.clone());
        let guilds = Arc::new(GuildStorage::new(ctx.clone(), users));
        let channels = Arc::new(ChannelStorage::new(ctx.clone()));
        (ctx.clone(), GuildCreate::new(ctx, guilds, channels))
    }

    #[test]
    fn test_guild_create_emits() {
        let (ctx, handler) = create_handler();
        let mut rx = ctx.events.subscribe();

        handler.handle(&from_json(json!({ "id": "G9", "name": "New" }))).unwrap();

        assert_eq!(rx.try_recv().unwrap().name(), "guildCreate");
        assert!(ctx.guilds.has("G9"));
    }

    #[test]
    fn test_guild_create_caches_channels() {
        let (ctx, handler) = create_handler();

        handler
            .handle(&from_json(json!({
                "id": "G1",
                "name": "Home",
                "channels": [
                    { "id": "10", "type": 0, "name": "general" },
                    { "id": "11", "type": 2, "name": "voice" }
                ]
            })))
            .unwrap();

        assert_eq!(ctx.channels.keys(), vec!["10", "11"]);
        let general = ctx.channels.get("10").unwrap();
        assert_eq!(general.read().guild_id.as_deref(), Some("G1"));
        assert_eq!(general.read().name.as_deref(), Some("general"));
    }

    #[test]
    fn test_guild_create_marks_stub_available() {
        let (ctx, handler) = create_handler();
        handler.handle(&from_json(json!({ "id": "G1", "unavailable": true }))).unwrap();
        assert!(ctx.guilds.get("G1").unwrap().read().unavailable);

        for unavailable in [json!(false), json!(null)] {
            handler
                .handle(&from_json(json!({ "id": "G1", "unavailable": true })))
                .unwrap();
            handler
                .handle(&from_json(json!({ "id": "G1", "name": "Home", "unavailable": unavailable })))
                .unwrap();
            assert!(!ctx.guilds.get("G1").unwrap().read().unavailable);
        }
    }
}
