//! The Provider Adapter contract (§4.1): the seam between a concrete
//! upstream listing source and the rest of the ingestion engine.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use aptwatch_types::listing::Query;
use aptwatch_types::report::FetchOutcome;
use aptwatch_types::source::SourceKey;
use aptwatch_types::{IngestError, Listing};

/// The result of one adapter invocation, before it is folded into a
/// [`FetchOutcome`] for reporting.
///
/// Distinct from `FetchOutcome` because it carries the actual listings on
/// success; `FetchOutcome` is the serializable summary that survives into a
/// [`aptwatch_types::report::JobReport`].
#[derive(Debug, Clone)]
pub enum AdapterResult {
    /// The adapter ran and produced normalized listings (possibly empty
    /// after the meaningful-content gate discarded every raw item).
    Items(Vec<Listing>),
    /// The adapter declined to run because its cooldown has not elapsed.
    SkippedCooldown {
        /// Milliseconds remaining until the cooldown elapses.
        remaining_ms: u64,
    },
    /// Every payload/URL variant the adapter attempted was rejected by the
    /// upstream actor.
    RemoteRejected,
    /// The upstream actor ran successfully but returned no items at all.
    RemoteEmpty,
    /// A transport-level failure exhausted the adapter's retry budget.
    TransportError(IngestError),
}

impl AdapterResult {
    /// Collapse this result into the listings it carries, if any.
    #[must_use]
    pub fn into_listings(self) -> Vec<Listing> {
        match self {
            Self::Items(items) => items,
            _ => Vec::new(),
        }
    }

    /// Project this result into the serializable summary stored in reports.
    #[must_use]
    pub fn as_outcome(&self) -> FetchOutcome {
        match self {
            Self::Items(items) => FetchOutcome::Items { count: items.len() },
            Self::SkippedCooldown { .. } => FetchOutcome::SkippedCooldown,
            Self::RemoteRejected => FetchOutcome::RemoteRejected,
            Self::RemoteEmpty => FetchOutcome::RemoteEmpty,
            Self::TransportError(_) => FetchOutcome::TransportError,
        }
    }
}

/// An upstream listing source, reachable through an actor-style HTTP API or
/// scraped directly.
///
/// Implementations own their own cooldown bookkeeping, retry policy and
/// URL-cascade logic; the contract exposed here is deliberately thin — fetch
/// listings for a query, tolerate failure locally, and report what happened
/// rather than panicking or blocking the rest of the fan-out.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable identity of this adapter, used for cooldown state, logging and
    /// dedup surrogate ids.
    fn source(&self) -> SourceKey;

    /// Run a single fetch attempt for `query`.
    ///
    /// `query.bypass_cooldown` instructs the adapter to ignore its own
    /// cooldown gate for exactly this call (used by the force-check path).
    async fn fetch(&self, query: &Query) -> AdapterResult;

    /// Downcast support for test harnesses that need to reach into a mock
    /// adapter's internal behavior controller.
    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn ProviderAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("source", &self.source())
            .finish()
    }
}

/// Convenience alias used throughout the scheduler and middleware layers.
pub type SharedAdapter = Arc<dyn ProviderAdapter>;
