use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the aptwatch ingestion-and-distribution engine.
///
/// Mirrors the taxonomy a provider call, a normalization step, a persistence
/// write, or a notification delivery can fail with. Variants are designed to
/// be serializable so they can ride along inside ingestion reports.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// A remote call timed out, reset the connection, or failed DNS/TLS.
    #[error("{source} transport error: {msg}")]
    Transport {
        /// Source identifier of the adapter that raised this error.
        source: String,
        /// Human-readable transport failure description.
        msg: String,
    },

    /// The upstream actor rejected the request body (4xx, excluding quota/payment).
    #[error("{source} rejected input: {msg}")]
    ProviderRejected {
        /// Source identifier of the adapter that raised this error.
        source: String,
        /// Human-readable rejection description.
        msg: String,
    },

    /// The upstream actor reported a quota/payment failure (e.g. HTTP 402).
    #[error("{source} quota/payment required: {msg}")]
    ProviderQuota {
        /// Source identifier of the adapter that raised this error.
        source: String,
        /// Human-readable quota failure description.
        msg: String,
    },

    /// An individual provider item failed to parse; the batch continues.
    #[error("parse error for {source} item: {msg}")]
    Parse {
        /// Source identifier of the adapter whose item failed to parse.
        source: String,
        /// Human-readable parse failure description.
        msg: String,
    },

    /// A persistence write conflicted with an existing unique index.
    #[error("persistence conflict on {entity}: {msg}")]
    PersistenceConflict {
        /// Entity/table/collection name the conflict occurred on.
        entity: String,
        /// Human-readable conflict description.
        msg: String,
    },

    /// A notification could not be delivered to the messaging collaborator.
    #[error("delivery failed for user {user_id}: {msg}")]
    Delivery {
        /// The user the delivery was addressed to.
        user_id: String,
        /// Human-readable delivery failure description.
        msg: String,
    },

    /// The adapter refused to run because its cooldown has not elapsed.
    #[error("{source} skipped: cooldown active, {remaining_ms}ms remaining")]
    CooldownActive {
        /// Source identifier of the adapter that is on cooldown.
        source: String,
        /// Milliseconds remaining until the cooldown elapses.
        remaining_ms: u64,
    },

    /// Invalid input argument (malformed query, bad configuration value, etc.).
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// A resource could not be found (user, filter, listing, subscription).
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource.
        what: String,
    },

    /// A dependency required at startup could not be reached; startup must abort.
    #[error("fatal startup error: {0}")]
    Fatal(String),

    /// Aggregate of per-provider failures from a fan-out fetch.
    #[error("all providers failed: {0:?}")]
    AllProvidersFailed(Vec<IngestError>),

    /// Unknown/opaque error, preserved for audit/debug purposes.
    #[error("unknown error: {0}")]
    Other(String),
}

impl IngestError {
    /// Build a [`Transport`](Self::Transport) error.
    pub fn transport(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Transport {
            source: source.into(),
            msg: msg.into(),
        }
    }

    /// Build a [`ProviderRejected`](Self::ProviderRejected) error.
    pub fn provider_rejected(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ProviderRejected {
            source: source.into(),
            msg: msg.into(),
        }
    }

    /// Build a [`ProviderQuota`](Self::ProviderQuota) error.
    pub fn provider_quota(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ProviderQuota {
            source: source.into(),
            msg: msg.into(),
        }
    }

    /// Build a [`Parse`](Self::Parse) error.
    pub fn parse(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Parse {
            source: source.into(),
            msg: msg.into(),
        }
    }

    /// Build a [`NotFound`](Self::NotFound) error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Returns true when this error is actionable (i.e. not a benign
    /// cooldown skip or not-found condition that the caller already expects).
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        match self {
            Self::CooldownActive { .. } | Self::NotFound { .. } => false,
            Self::AllProvidersFailed(inner) => inner.iter().any(Self::is_actionable),
            _ => true,
        }
    }

    /// Flatten nested `AllProvidersFailed` aggregates into a plain vector.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::AllProvidersFailed(list) => list.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }

    /// Whether the underlying failure is retryable within the same attempt
    /// window (transport errors and provider-input rejections are; quota and
    /// parse failures are not, per the retry policy).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
