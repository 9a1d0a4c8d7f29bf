//! Per-kind storage policies.
//!
//! Each storage wraps a generic [`Cache`](crate::cache::Cache) and decides how
//! raw payloads become canonical entities. Storages receive the
//! [`ClientContext`](crate::context::ClientContext) and any sibling storage
//! they depend on at construction.

mod channel;
mod guild;
mod user;

use crate::cache::Handle;
use crate::error::Result;
use crate::models::{Entity, Payload};

pub use channel::ChannelStorage;
pub use guild::GuildStorage;
pub use user::UserStorage;

/// Get-or-create construction of entities from raw payloads.
pub trait Factory {
    type Entity: Entity;

    /// Patch and return the cached entity for `data.id`, or build, insert
    /// and return a new one.
    fn factory(&self, data: &Payload) -> Result<Handle<Self::Entity>>;
}
