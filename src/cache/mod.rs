//! Cache module - entity caches and secondary record caches.
//!
//! ## Architecture
//!
//! - `Cache` - insertion-ordered store holding one live instance per id
//! - `Handle` - shared reference to that instance; patches are seen by every holder
//! - `Resolvable` - the reference forms accepted by `Cache::resolve`
//! - `PresenceCache` - Moka-backed bounded store for presence records
//!
//! ## Usage
//!
//! ```rust,ignore
//! let users: Cache<User> = Cache::new("users");
//! users.set(user.id(), handle.clone());
//!
//! // Same instance, whichever way it is referenced
//! let by_id = users.resolve("80351110224678912")?;
//! let by_member = users.resolve(member_handle)?;
//! ```

mod config;
mod handle;
mod presences;
mod store;

pub use config::CacheConfig;
pub use handle::Handle;
pub use store::{Cache, Related, Resolvable};
pub use presences::PresenceCache;
