//! Cached gateway entities.

pub mod channel;
pub mod guild;
pub mod member;
pub mod payload;
pub mod presence;
pub mod user;

use std::fmt::Debug;

use crate::error::Result;

pub use channel::Channel;
pub use guild::Guild;
pub use member::GuildMember;
pub use payload::Payload;
pub use presence::Presence;
pub use user::{Provenance, User};

/// A mutable record with a stable identifier and an in-place patch.
///
/// `Clone` produces the pre-patch snapshot handed to event subscribers, so it
/// must not share mutable state with the original.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Singular kind name used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Apply the fields present in `data`. Either every field applies or,
    /// on error, none does.
    fn patch(&mut self, data: &Payload) -> Result<()>;
}
