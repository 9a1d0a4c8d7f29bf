//! Presence records, kept in the secondary presence cache.

use serde::{Deserialize, Serialize};

use super::payload::{self, Payload};
use crate::error::{CacheError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub user_id: String,
    pub status: String,
    /// Name of the first activity, if any.
    pub activity: Option<String>,
}

#[derive(Deserialize)]
struct Activity {
    name: String,
}

impl Presence {
    const KIND: &'static str = "presence";

    /// Build from a `PRESENCE_UPDATE` payload (`user.id`, `status`, `activities`).
    pub fn from_payload(data: &Payload) -> Result<Self> {
        let user = payload::object(data, Self::KIND, "user")?
            .ok_or(CacheError::missing(Self::KIND, "user"))?;
        let user_id = payload::require_id(user, Self::KIND)?;
        let status = payload::field(data, Self::KIND, "status")?
            .unwrap_or_else(|| "offline".to_string());
        let activities: Vec<Activity> =
            payload::field(data, Self::KIND, "activities")?.unwrap_or_default();

        Ok(Self {
            user_id,
            status,
            activity: activities.into_iter().next().map(|a| a.name),
        })
    }
}
