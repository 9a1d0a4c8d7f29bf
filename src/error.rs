//! Error types surfaced by the cache layer.

use thiserror::Error;

/// Errors raised while resolving, constructing or patching cached entities.
///
/// None of these are retried here; the transport layer decides whether to
/// keep processing subsequent frames.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The reference matched no cached entity.
    #[error("unable to resolve unknown {kind}")]
    UnresolvableReference { kind: &'static str },

    /// A payload lacks a field the entity cannot exist without.
    #[error("{kind} payload is missing required field `{field}`")]
    MissingRequiredField {
        kind: &'static str,
        field: &'static str,
    },

    /// A field is present but has the wrong shape.
    #[error("{kind} payload has an invalid `{field}` field: {source}")]
    InvalidField {
        kind: &'static str,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The `d` of a gateway frame was not a JSON object.
    #[error("payload for {event} is not an object")]
    MalformedPayload { event: String },
}

impl CacheError {
    pub fn missing(kind: &'static str, field: &'static str) -> Self {
        Self::MissingRequiredField { kind, field }
    }
}

pub type Result<T, E = CacheError> = std::result::Result<T, E>;
