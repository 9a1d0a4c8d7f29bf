//! Shared entity handles.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::Entity;

/// Shared reference to the one live instance of an entity.
///
/// Every holder of a handle sees patches applied through any other clone of
/// it. Cloning is cheap and never copies the entity.
pub struct Handle<E> {
    inner: Arc<RwLock<E>>,
}

// Manual Clone implementation that doesn't require E: Clone
impl<E> Clone for Handle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity> Handle<E> {
    pub fn new(entity: E) -> Self {
        Self {
            inner: Arc::new(RwLock::new(entity)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, E> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, E> {
        self.inner.write()
    }

    pub fn id(&self) -> String {
        self.inner.read().id().to_string()
    }

    /// Point-in-time copy of the entity, detached from later patches.
    pub fn snapshot(&self) -> E {
        self.inner.read().clone()
    }

    /// Whether both handles point at the same instance.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl<E: fmt::Debug> fmt::Debug for Handle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_read() {
            Some(entity) => fmt::Debug::fmt(&*entity, f),
            None => f.write_str("Handle(<locked>)"),
        }
    }
}
