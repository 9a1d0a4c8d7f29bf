//! User storage: factory, fan-out to the primary cache, and sweeping.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::Factory;
use crate::cache::{Cache, Handle, Resolvable};
use crate::context::ClientContext;
use crate::error::Result;
use crate::models::payload::{self, Payload};
use crate::models::{Entity, Provenance, User};
use crate::sweep::{Sweep, SweepTimer};

/// Users either globally (wrapping the context's primary cache) or scoped to
/// some narrower view.
///
/// A scoped storage mirrors every write and delete into the primary cache,
/// never the reverse, so a user has the same instance in both views.
pub struct UserStorage {
    ctx: Arc<ClientContext>,
    cache: Arc<Cache<User>>,
    sweeper: Mutex<Option<SweepTimer>>,
}

impl UserStorage {
    /// The global storage, backed by `ctx.users`.
    pub fn new(ctx: Arc<ClientContext>) -> Arc<Self> {
        let cache = Arc::clone(&ctx.users);
        Self::with_cache(ctx, cache)
    }

    /// A scoped storage with its own cache.
    pub fn scoped(ctx: Arc<ClientContext>, name: &str) -> Arc<Self> {
        Self::with_cache(ctx, Arc::new(Cache::new(name)))
    }

    fn with_cache(ctx: Arc<ClientContext>, cache: Arc<Cache<User>>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let target: Weak<dyn Sweep> = this.clone();
            let sweeper = SweepTimer::start(cache.name(), target, ctx.options.sweep_interval());
            Self {
                ctx,
                cache,
                sweeper: Mutex::new(sweeper),
            }
        })
    }

    /// Whether this storage wraps the primary cache.
    pub fn is_primary(&self) -> bool {
        Arc::ptr_eq(&self.cache, &self.ctx.users)
    }

    /// Stop the sweep timer, if one is running.
    pub fn stop_sweeper(&self) {
        if let Some(timer) = self.sweeper.lock().take() {
            timer.stop();
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    pub fn has(&self, key: &str) -> bool {
        self.cache.has(key)
    }

    pub fn get(&self, key: &str) -> Option<Handle<User>> {
        self.cache.get(key)
    }

    pub fn all(&self) -> Vec<Handle<User>> {
        self.cache.all()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn resolve(&self, user: impl Into<Resolvable<User>>) -> Result<Handle<User>> {
        self.cache.resolve(user)
    }

    /// Store `user` here and, for scoped storages, in the primary cache.
    pub fn set(&self, key: &str, user: Handle<User>) -> &Self {
        self.cache.set(key, user.clone());
        if !self.is_primary() {
            self.ctx.users.set(key, user);
        }
        self
    }

    /// Remove `key` here and, for scoped storages, from the primary cache.
    pub fn delete(&self, key: &str) -> &Self {
        self.cache.delete(key);
        if !self.is_primary() {
            self.ctx.users.delete(key);
        }
        self
    }

    /// Run the factory for an explicitly requested user. An already cached
    /// user is upgraded to [`Provenance::Fetched`] and becomes sweep-exempt.
    pub fn fetched(&self, data: &Payload) -> Result<Handle<User>> {
        self.factory_with(data, Provenance::Fetched)
    }

    /// Return the cached user for `data.id`, patched with `data`.
    ///
    /// On a miss, a payload carrying nothing but the id yields `Ok(None)`:
    /// a bare reference is not enough to materialise a user. Anything else
    /// goes through the factory.
    pub fn patch(&self, data: &Payload) -> Result<Option<Handle<User>>> {
        let _policy = self.ctx.lock_users();
        let id = payload::require_id(data, User::KIND)?;
        let bare = payload::is_bare_id(data);

        if let Some(user) = self.cache.get(&id) {
            if !bare {
                user.write().patch(data)?;
            }
            return Ok(Some(user));
        }

        if bare {
            return Ok(None);
        }

        self.factory(data).map(Some)
    }

    fn factory_with(&self, data: &Payload, provenance: Provenance) -> Result<Handle<User>> {
        let _policy = self.ctx.lock_users();
        let id = payload::require_id(data, User::KIND)?;

        // A scoped miss may still be a primary hit; adopt that instance.
        let mut adopted = false;
        let (user, inserted) = self.cache.get_or_try_insert_with(&id, || {
            if !self.is_primary()
                && let Some(existing) = self.ctx.users.get(&id)
            {
                adopted = true;
                return Ok(existing);
            }
            User::new(data, provenance).map(Handle::new)
        })?;

        if inserted {
            if !self.is_primary() {
                self.ctx.users.set(id.as_str(), user.clone());
            }
            if !adopted {
                debug!("Cached new user {} in {}", id, self.cache.name());
                return Ok(user);
            }
        }

        {
            let mut existing = user.write();
            existing.patch(data)?;
            if provenance == Provenance::Fetched {
                existing.provenance = Provenance::Fetched;
            }
        }
        Ok(user)
    }

    /// Ids reachable through any cached guild's member list.
    fn live_ids(&self) -> HashSet<String> {
        self.ctx
            .guilds
            .all()
            .iter()
            .flat_map(|guild| guild.read().member_ids())
            .collect()
    }
}

impl Factory for UserStorage {
    type Entity = User;

    fn factory(&self, data: &Payload) -> Result<Handle<User>> {
        self.factory_with(data, Provenance::Observed)
    }
}

impl Sweep for UserStorage {
    /// Remove users that are not the client user, were never fetched
    /// explicitly, and share no cached guild. Their presences go too.
    fn sweep(&self) -> usize {
        let _policy = self.ctx.lock_users();
        let live = self.live_ids();

        let mut amount = 0;
        for (key, user) in self.cache.iter() {
            let exempt = {
                let user = user.read();
                self.ctx.is_client_user(&user.id) || user.is_fetched()
            };
            if exempt || live.contains(&key) {
                continue;
            }

            self.ctx.presences.invalidate(&key);
            self.delete(&key);
            amount += 1;
        }

        if amount > 0 {
            info!("Swept {} users from {}", amount, self.cache.name());
        }
        amount
    }
}

impl std::fmt::Debug for UserStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStorage")
            .field("cache", &self.cache)
            .field("primary", &self.is_primary())
            .field("sweeping", &self.is_sweeping())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientOptions;
    use crate::error::CacheError;
    use crate::models::payload::from_json;
    use crate::models::{Guild, GuildMember, Presence};
    use serde_json::json;
    use std::time::Duration;

    fn ctx() -> Arc<ClientContext> {
        Arc::new(ClientContext::default())
    }

    fn user(id: &str, name: &str) -> Payload {
        from_json(json!({ "id": id, "username": name }))
    }

    fn add_member(ctx: &ClientContext, guild_id: &str, user: &Handle<User>) {
        let guild = ctx.guilds.get(guild_id).unwrap_or_else(|| {
            let guild = Handle::new(Guild::new(&from_json(json!({ "id": guild_id, "name": "g" }))).unwrap());
            ctx.guilds.set(guild_id, guild.clone());
            guild
        });
        let member = GuildMember::new(guild_id, user.clone(), &Payload::new()).unwrap();
        guild.read().members.set(member.id.clone(), Handle::new(member));
    }

    #[test]
    fn test_factory_preserves_identity() {
        let users = UserStorage::new(ctx());

        let first = users.factory(&user("1", "alice")).unwrap();
        let second = users.factory(&user("1", "alicia")).unwrap();

        assert!(Handle::ptr_eq(&first, &second));
        assert_eq!(first.read().username, "alicia");
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_factory_accepts_integer_ids() {
        let users = UserStorage::new(ctx());
        let a = users.factory(&from_json(json!({ "id": 5, "username": "a" }))).unwrap();
        assert!(Handle::ptr_eq(&a, &users.resolve(5u64).unwrap()));
    }

    #[test]
    fn test_factory_surfaces_missing_fields() {
        let users = UserStorage::new(ctx());
        let err = users.factory(&from_json(json!({ "username": "x" }))).unwrap_err();
        assert!(matches!(err, CacheError::MissingRequiredField { field: "id", .. }));
        assert!(users.is_empty());
    }

    #[test]
    fn test_patch_bare_id_is_noop() {
        let users = UserStorage::new(ctx());
        let result = users.patch(&from_json(json!({ "id": "9" }))).unwrap();
        assert!(result.is_none());
        assert!(users.is_empty());
    }

    #[test]
    fn test_patch_existing_and_new() {
        let users = UserStorage::new(ctx());
        let cached = users.factory(&user("1", "alice")).unwrap();

        let same = users.patch(&from_json(json!({ "id": "1" }))).unwrap().unwrap();
        assert!(Handle::ptr_eq(&cached, &same));

        users.patch(&from_json(json!({ "id": "1", "avatar": "x" }))).unwrap();
        assert_eq!(cached.read().avatar.as_deref(), Some("x"));

        let created = users.patch(&user("2", "bob")).unwrap().unwrap();
        assert_eq!(created.read().provenance, Provenance::Observed);
        assert!(users.has("2"));
    }

    #[test]
    fn test_fetched_upgrades_provenance() {
        let users = UserStorage::new(ctx());
        let observed = users.factory(&user("1", "alice")).unwrap();
        assert!(!observed.read().is_fetched());

        users.fetched(&user("1", "alice")).unwrap();
        assert!(observed.read().is_fetched());

        // A later incidental sighting does not downgrade it.
        users.factory(&user("1", "alice")).unwrap();
        assert!(observed.read().is_fetched());
    }

    #[test]
    fn test_resolve_through_member() {
        let ctx = ctx();
        let users = UserStorage::new(ctx.clone());
        let alice = users.factory(&user("1", "alice")).unwrap();
        let member = Handle::new(GuildMember::new("g", alice.clone(), &Payload::new()).unwrap());

        assert!(Handle::ptr_eq(&users.resolve(member).unwrap(), &alice));
        assert!(Handle::ptr_eq(&users.resolve(alice.clone()).unwrap(), &alice));
        assert!(matches!(
            users.resolve("404"),
            Err(CacheError::UnresolvableReference { kind: "user" })
        ));
    }

    #[test]
    fn test_scoped_fans_out_to_primary() {
        let ctx = ctx();
        let scoped = UserStorage::scoped(ctx.clone(), "scoped-users");
        assert!(!scoped.is_primary());

        let e = Handle::new(User::new(&user("1", "alice"), Provenance::Observed).unwrap());
        scoped.set("1", e.clone());
        assert!(Handle::ptr_eq(&ctx.users.get("1").unwrap(), &e));

        scoped.delete("1");
        assert!(!ctx.users.has("1"));
        assert!(!scoped.has("1"));
    }

    #[test]
    fn test_primary_never_writes_scoped() {
        let ctx = ctx();
        let scoped = UserStorage::scoped(ctx.clone(), "scoped-users");
        let global = UserStorage::new(ctx.clone());

        global.factory(&user("1", "alice")).unwrap();
        assert!(!scoped.has("1"));
    }

    #[test]
    fn test_scoped_factory_adopts_primary_instance() {
        let ctx = ctx();
        let global = UserStorage::new(ctx.clone());
        let scoped = UserStorage::scoped(ctx.clone(), "scoped-users");

        let original = global.factory(&user("1", "alice")).unwrap();
        let scoped_user = scoped.factory(&user("1", "alicia")).unwrap();

        assert!(Handle::ptr_eq(&original, &scoped_user));
        assert_eq!(original.read().username, "alicia");

        let fresh = scoped.factory(&user("2", "bob")).unwrap();
        assert!(Handle::ptr_eq(&fresh, &ctx.users.get("2").unwrap()));
    }

    #[test]
    fn test_sweep_exemptions() {
        let ctx = ctx();
        let users = UserStorage::new(ctx.clone());

        users.factory(&user("A", "self")).unwrap();
        users.fetched(&user("B", "fetched")).unwrap();
        users.factory(&user("C", "observed")).unwrap();
        ctx.set_client_user_id("A");

        assert_eq!(users.sweep(), 1);
        assert!(users.has("A"));
        assert!(users.has("B"));
        assert!(!users.has("C"));
        assert_eq!(users.sweep(), 0);
    }

    #[test]
    fn test_sweep_keeps_members_and_drops_presences() {
        let ctx = ctx();
        let users = UserStorage::new(ctx.clone());

        let member = users.factory(&user("1", "member")).unwrap();
        users.factory(&user("2", "stranger")).unwrap();
        users.factory(&user("3", "other")).unwrap();
        add_member(&ctx, "g1", &member);

        for id in ["1", "2"] {
            ctx.presences.replace(Presence {
                user_id: id.to_string(),
                status: "online".to_string(),
                activity: None,
            });
        }

        assert_eq!(users.sweep(), 2);
        assert_eq!(users.all().len(), 1);
        assert!(users.has("1"));
        assert!(ctx.presences.get("1").is_some());
        assert!(ctx.presences.get("2").is_none());
    }

    #[test]
    fn test_scoped_sweep_removes_from_primary() {
        let ctx = ctx();
        let scoped = UserStorage::scoped(ctx.clone(), "scoped-users");
        scoped.factory(&user("1", "alice")).unwrap();

        assert_eq!(scoped.sweep(), 1);
        assert!(!ctx.users.has("1"));
    }

    #[test]
    fn test_no_timer_when_disabled() {
        let ctx = Arc::new(ClientContext::new(ClientOptions {
            user_sweep_interval: 0,
            ..Default::default()
        }));
        let users = UserStorage::new(ctx);
        assert!(!users.is_sweeping());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_sweeps_periodically() {
        let ctx = Arc::new(ClientContext::new(ClientOptions {
            user_sweep_interval: 60,
            ..Default::default()
        }));
        let users = UserStorage::new(ctx);
        assert!(users.is_sweeping());

        users.factory(&user("1", "alice")).unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(users.has("1"));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(!users.has("1"));

        users.stop_sweeper();
        assert!(!users.is_sweeping());
        users.factory(&user("2", "bob")).unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(users.has("2"));
    }
}
