//! Mock provider adapters for CI-safe tests and examples: deterministic
//! fixture data plus a dynamically-controllable adapter for exercising
//! middleware and scheduler behavior without a real upstream actor.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use aptwatch_core::{AdapterResult, ProviderAdapter};
use aptwatch_types::listing::{Listing, Query};
use aptwatch_types::source::SourceKey;

mod dynamic;
pub mod fixtures;

pub use dynamic::{DynamicMockAdapter, DynamicMockController, MockBehavior};

/// A [`ProviderAdapter`] that always returns the same fixed set of listings,
/// and records every query it was called with for test assertions.
pub struct MockProviderAdapter {
    source: SourceKey,
    listings: Vec<Listing>,
    calls: Arc<Mutex<Vec<Query>>>,
}

impl MockProviderAdapter {
    /// Build a mock adapter for `source` that always returns `listings`.
    #[must_use]
    pub fn with_fixtures(source: SourceKey, listings: Vec<Listing>) -> Self {
        Self {
            source,
            listings,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times `fetch` has been called so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Every query this adapter has been called with, in call order.
    pub async fn recorded_queries(&self) -> Vec<Query> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ProviderAdapter for MockProviderAdapter {
    fn source(&self) -> SourceKey {
        self.source
    }

    async fn fetch(&self, query: &Query) -> AdapterResult {
        self.calls.lock().await.push(query.clone());
        AdapterResult::Items(self.listings.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
