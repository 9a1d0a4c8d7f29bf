//! Gateway Cache - entity cache and state synchronization for a gateway client
//!
//! Holds one canonical in-memory instance per remote object, keeps it current
//! as gateway update events arrive, and evicts users no longer reachable
//! through any guild.
//!
//! ## Architecture
//!
//! - `cache` - Insertion-ordered entity caches and shared handles
//! - `config` - Client options from environment or serde
//! - `context` - Caches and event bus shared by every storage
//! - `storage` - Factory and eviction policies per entity kind
//! - `sweep` - Periodic eviction timer
//! - `events` - Gateway handlers and client event broadcast
//! - `models` - Users, guilds, members, channels, presences
//! - `client` - Wires everything together

pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod models;
pub mod storage;
pub mod sweep;

pub use client::Client;
pub use config::{ClientOptions, DisableClones};
pub use error::{CacheError, Result};
pub use events::{ClientEvent, GatewayFrame};
