//! Source identity for provider adapters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed identifier of an upstream listing provider.
///
/// Adapters are keyed by this value in configuration, cooldown state,
/// dedup surrogate ids (`source` component) and ingestion reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceKey(pub &'static str);

impl SourceKey {
    /// The `ImmobilienScout24` provider.
    pub const IMMOSCOUT24: Self = Self("immobilienscout24");
    /// The Immowelt provider.
    pub const IMMOWELT: Self = Self("immowelt");
    /// The Kleinanzeigen provider.
    pub const KLEINANZEIGEN: Self = Self("kleinanzeigen");
    /// Pseudo-source used when tagging results pulled from persistence
    /// rather than a live adapter (used during feed diversification).
    pub const PERSISTENCE: Self = Self("persistence");

    /// Construct a new typed source key from a static name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the inner static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl From<SourceKey> for &'static str {
    fn from(k: SourceKey) -> Self {
        k.0
    }
}
