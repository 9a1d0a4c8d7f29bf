//! Client options.
//!
//! Loaded from environment variables, or deserialized from the camelCase
//! option names (`userSweepInterval`, `disableClones`).

use std::collections::HashSet;
use std::env;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::cache::CacheConfig;

/// Default user sweep interval, in seconds.
pub const DEFAULT_USER_SWEEP_INTERVAL: i64 = 600;

/// Default capacity of the client event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Which event kinds skip the pre-patch snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawDisableClones")]
pub enum DisableClones {
    /// Snapshot every event kind.
    #[default]
    None,
    /// Snapshot nothing.
    All,
    /// Skip the listed event kinds, e.g. `guildUpdate`.
    Only(HashSet<String>),
}

/// Accepts `true`/`false` or a list of event kinds.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDisableClones {
    Flag(bool),
    Kinds(Vec<String>),
}

impl From<RawDisableClones> for DisableClones {
    fn from(raw: RawDisableClones) -> Self {
        match raw {
            RawDisableClones::Flag(true) => Self::All,
            RawDisableClones::Flag(false) => Self::None,
            RawDisableClones::Kinds(kinds) => Self::only(kinds),
        }
    }
}

impl DisableClones {
    pub fn only<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(kinds.into_iter().map(Into::into).collect())
    }

    /// Whether events of `kind` carry a snapshot.
    pub fn clones_enabled(&self, kind: &str) -> bool {
        match self {
            Self::None => true,
            Self::All => false,
            Self::Only(kinds) => !kinds.contains(kind),
        }
    }

    /// Parse the `DISABLE_CLONES` format: `true`, `false`, or a comma list.
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "false" | "0" => Self::None,
            "true" | "1" => Self::All,
            _ => Self::only(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty()),
            ),
        }
    }
}

/// Options recognised by the cache layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientOptions {
    /// Seconds between user sweeps. Zero or negative disables the timer.
    pub user_sweep_interval: i64,

    pub disable_clones: DisableClones,

    /// Buffered events per subscriber before slow subscribers lag.
    pub event_capacity: usize,

    /// Bounds for the presence cache.
    pub presences: CacheConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user_sweep_interval: DEFAULT_USER_SWEEP_INTERVAL,
            disable_clones: DisableClones::None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            presences: CacheConfig::presences(),
        }
    }
}

impl ClientOptions {
    /// Load options from environment variables, falling back to defaults.
    ///
    /// - `USER_SWEEP_INTERVAL` - seconds, `<= 0` disables sweeping
    /// - `DISABLE_CLONES` - `true`, or comma-separated event kinds
    /// - `EVENT_CHANNEL_CAPACITY`
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut options = Self::default();

        if let Ok(value) = env::var("USER_SWEEP_INTERVAL") {
            options.user_sweep_interval =
                value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    var: "USER_SWEEP_INTERVAL",
                    value: value.clone(),
                })?;
        }

        if let Ok(value) = env::var("DISABLE_CLONES") {
            options.disable_clones = DisableClones::parse(&value);
        }

        if let Ok(value) = env::var("EVENT_CHANNEL_CAPACITY") {
            options.event_capacity = value
                .trim()
                .parse()
                .ok()
                .filter(|&n: &usize| n > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    var: "EVENT_CHANNEL_CAPACITY",
                    value: value.clone(),
                })?;
        }

        Ok(options)
    }

    /// The sweep period, or `None` when sweeping is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        u64::try_from(self.user_sweep_interval)
            .ok()
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    pub fn clones_enabled(&self, kind: &str) -> bool {
        self.disable_clones.clones_enabled(kind)
    }
}
