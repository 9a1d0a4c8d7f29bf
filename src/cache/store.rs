//! Insertion-ordered entity cache.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::Handle;
use crate::error::{CacheError, Result};
use crate::models::Entity;

/// An entity that carries a back-reference to another entity kind,
/// such as a guild member pointing at its user.
pub trait Related<E: Entity>: Send + Sync {
    fn related(&self) -> Handle<E>;
}

/// Accepted forms of reference for [`Cache::resolve`].
pub enum Resolvable<E: Entity> {
    /// The entity itself, returned as-is.
    ByEntity(Handle<E>),
    /// A related entity, resolved through its back-reference.
    ByRelated(Box<dyn Related<E>>),
    /// A raw id, looked up in the cache.
    ById(String),
}

impl<E: Entity> From<Handle<E>> for Resolvable<E> {
    fn from(handle: Handle<E>) -> Self {
        Self::ByEntity(handle)
    }
}

impl<E: Entity> From<&str> for Resolvable<E> {
    fn from(id: &str) -> Self {
        Self::ById(id.to_string())
    }
}

impl<E: Entity> From<String> for Resolvable<E> {
    fn from(id: String) -> Self {
        Self::ById(id)
    }
}

impl<E: Entity> From<u64> for Resolvable<E> {
    fn from(id: u64) -> Self {
        Self::ById(id.to_string())
    }
}

impl<E: Entity> From<i64> for Resolvable<E> {
    fn from(id: i64) -> Self {
        Self::ById(id.to_string())
    }
}

struct Slot<E> {
    seq: u64,
    handle: Handle<E>,
}

struct Entries<E> {
    slots: HashMap<String, Slot<E>>,
    /// Insertion sequence -> key. Overwrites keep their original position.
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl<E: Entity> Entries<E> {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    fn insert(&mut self, key: String, handle: Handle<E>) -> Option<Handle<E>> {
        if let Some(slot) = self.slots.get_mut(&key) {
            return Some(std::mem::replace(&mut slot.handle, handle));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.slots.insert(key, Slot { seq, handle });
        None
    }

    fn remove(&mut self, key: &str) -> Option<Handle<E>> {
        let slot = self.slots.remove(key)?;
        self.order.remove(&slot.seq);
        Some(slot.handle)
    }

    fn ordered(&self) -> impl Iterator<Item = (&String, &Handle<E>)> {
        self.order
            .values()
            .filter_map(|key| self.slots.get(key).map(|slot| (key, &slot.handle)))
    }
}

/// Keyed store holding exactly one live instance per id.
///
/// All methods take `&self`; a single lock per cache guards the map. Reads
/// that return collections ([`all`](Self::all), [`entries`](Self::entries),
/// iteration) return a point-in-time copy of the handles, so the cache may
/// be mutated while the caller walks the result.
pub struct Cache<E: Entity> {
    name: Arc<str>,
    entries: RwLock<Entries<E>>,
}

impl<E: Entity> Cache<E> {
    /// Create an empty cache with the given name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        debug!("Creating cache: {}", name);
        Self {
            name,
            entries: RwLock::new(Entries::new()),
        }
    }

    /// Get the name of this cache.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.read().slots.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Handle<E>> {
        self.entries.read().slots.get(key).map(|slot| slot.handle.clone())
    }

    /// Insert or overwrite. An overwritten key keeps its position.
    pub fn set(&self, key: impl Into<String>, value: Handle<E>) -> &Self {
        self.entries.write().insert(key.into(), value);
        self
    }

    /// Remove a key. No-op if absent.
    pub fn delete(&self, key: &str) -> &Self {
        self.remove(key);
        self
    }

    /// Remove a key, returning the handle that was stored under it.
    pub fn remove(&self, key: &str) -> Option<Handle<E>> {
        self.entries.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().slots.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().ordered().map(|(k, _)| k.clone()).collect()
    }

    /// Every entity in insertion order.
    pub fn all(&self) -> Vec<Handle<E>> {
        self.entries.read().ordered().map(|(_, h)| h.clone()).collect()
    }

    /// Every `(key, entity)` pair in insertion order.
    pub fn entries(&self) -> Vec<(String, Handle<E>)> {
        self.entries
            .read()
            .ordered()
            .map(|(k, h)| (k.clone(), h.clone()))
            .collect()
    }

    /// Iterate over a snapshot of the entries. Call again to restart.
    pub fn iter(&self) -> std::vec::IntoIter<(String, Handle<E>)> {
        self.entries().into_iter()
    }

    /// Return the cached entity for `key`, or obtain one with `init` and
    /// insert it. The bool is `true` when `init` ran.
    ///
    /// The lookup and insert happen under one write lock, so two callers
    /// racing on the same key still end up with a single instance. `init`
    /// must not touch this cache.
    pub fn get_or_try_insert_with<F>(&self, key: &str, init: F) -> Result<(Handle<E>, bool)>
    where
        F: FnOnce() -> Result<Handle<E>>,
    {
        let mut entries = self.entries.write();
        if let Some(slot) = entries.slots.get(key) {
            return Ok((slot.handle.clone(), false));
        }
        let handle = init()?;
        entries.insert(key.to_string(), handle.clone());
        Ok((handle, true))
    }

    /// Resolve a loosely specified reference to the canonical entity.
    pub fn resolve(&self, reference: impl Into<Resolvable<E>>) -> Result<Handle<E>> {
        match reference.into() {
            Resolvable::ByEntity(handle) => Ok(handle),
            Resolvable::ByRelated(related) => Ok(related.related()),
            Resolvable::ById(id) => self
                .get(&id)
                .ok_or(CacheError::UnresolvableReference { kind: E::KIND }),
        }
    }
}

impl<'a, E: Entity> IntoIterator for &'a Cache<E> {
    type Item = (String, Handle<E>);
    type IntoIter = std::vec::IntoIter<(String, Handle<E>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Detached deep copy: same keys in the same order, each entity cloned into
/// a fresh handle. Used when the owner of a cache is snapshotted.
impl<E: Entity> Clone for Cache<E> {
    fn clone(&self) -> Self {
        let mut copy = Entries::new();
        for (key, handle) in self.entries.read().ordered() {
            copy.insert(key.clone(), Handle::new(handle.snapshot()));
        }
        Self {
            name: Arc::clone(&self.name),
            entries: RwLock::new(copy),
        }
    }
}

impl<E: Entity> fmt::Debug for Cache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payload::{Payload, from_json};
    use serde_json::json;

    #[derive(Clone, Debug)]
    struct Item {
        id: String,
        value: i64,
    }

    impl Entity for Item {
        const KIND: &'static str = "item";

        fn id(&self) -> &str {
            &self.id
        }

        fn patch(&mut self, data: &Payload) -> Result<()> {
            if let Some(value) = crate::models::payload::field(data, Self::KIND, "value")? {
                self.value = value;
            }
            Ok(())
        }
    }

    fn item(id: &str, value: i64) -> Handle<Item> {
        Handle::new(Item {
            id: id.to_string(),
            value,
        })
    }

    struct Wrapper(Handle<Item>);

    impl Related<Item> for Wrapper {
        fn related(&self) -> Handle<Item> {
            self.0.clone()
        }
    }

    #[test]
    fn test_set_get_has_delete() {
        let cache = Cache::new("items");
        cache.set("a", item("a", 1)).set("b", item("b", 2));

        assert!(cache.has("a"));
        assert_eq!(cache.get("b").unwrap().read().value, 2);
        assert_eq!(cache.len(), 2);

        cache.delete("a").delete("missing");
        assert!(!cache.has("a"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insertion_order_survives_overwrite() {
        let cache = Cache::new("items");
        cache.set("c", item("c", 1));
        cache.set("a", item("a", 1));
        cache.set("b", item("b", 1));
        cache.set("c", item("c", 9));
        cache.delete("a");
        cache.set("a", item("a", 2));

        assert_eq!(cache.keys(), vec!["c", "b", "a"]);
        assert_eq!(cache.all()[0].read().value, 9);
    }

    #[test]
    fn test_iteration_is_a_snapshot() {
        let cache = Cache::new("items");
        cache.set("a", item("a", 1)).set("b", item("b", 2));

        let mut seen = Vec::new();
        for (key, _) in &cache {
            cache.delete(&key);
            seen.push(key);
        }

        assert_eq!(seen, vec!["a", "b"]);
        assert!(cache.is_empty());
        assert_eq!(cache.iter().count(), 0);
    }

    #[test]
    fn test_get_or_try_insert_with_keeps_one_instance() {
        let cache = Cache::new("items");
        let (first, created) = cache
            .get_or_try_insert_with("a", || Ok(item("a", 1)))
            .unwrap();
        assert!(created);

        let (second, created) = cache
            .get_or_try_insert_with("a", || panic!("must not build twice"))
            .unwrap();
        assert!(!created);
        assert!(Handle::ptr_eq(&first, &second));
    }

    #[test]
    fn test_get_or_try_insert_with_propagates_errors() {
        let cache: Cache<Item> = Cache::new("items");
        let err = cache
            .get_or_try_insert_with("a", || Err(CacheError::missing("item", "value")))
            .unwrap_err();
        assert!(matches!(err, CacheError::MissingRequiredField { .. }));
        assert!(!cache.has("a"));
    }

    #[test]
    fn test_resolve_variants() {
        let cache = Cache::new("items");
        let a = item("42", 1);
        cache.set("42", a.clone());

        let by_entity = cache.resolve(a.clone()).unwrap();
        let by_related = cache
            .resolve(Resolvable::ByRelated(Box::new(Wrapper(a.clone()))))
            .unwrap();
        let by_str = cache.resolve("42").unwrap();
        let by_int = cache.resolve(42u64).unwrap();

        for resolved in [by_entity, by_related, by_str, by_int] {
            assert!(Handle::ptr_eq(&resolved, &a));
        }
    }

    #[test]
    fn test_resolve_unknown_id_fails() {
        let cache: Cache<Item> = Cache::new("items");
        let err = cache.resolve("nope").unwrap_err();
        assert!(matches!(err, CacheError::UnresolvableReference { kind: "item" }));
    }

    #[test]
    fn test_clone_is_detached() {
        let cache = Cache::new("items");
        let a = item("a", 1);
        cache.set("a", a.clone());

        let copy = cache.clone();
        a.write().patch(&from_json(json!({ "value": 5 }))).unwrap();

        assert_eq!(copy.get("a").unwrap().read().value, 1);
        assert!(!Handle::ptr_eq(&copy.get("a").unwrap(), &a));
    }
}
