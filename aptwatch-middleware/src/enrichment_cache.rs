//! Enrichment-caching middleware (§4.2): avoids re-fetching the detail page
//! for a listing whose description/images were already scraped recently,
//! keyed by the listing's canonical URL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::json;

use aptwatch_core::{AdapterResult, Middleware, ProviderAdapter, SharedAdapter};
use aptwatch_types::listing::Query;
use aptwatch_types::source::SourceKey;

#[derive(Clone)]
struct CachedEnrichment {
    description: String,
    images: Vec<String>,
}

/// An adapter wrapper that caches description/image enrichment results by
/// canonical URL, so the same listing reappearing across cycles doesn't
/// trigger another detail-page fetch until the cache entry expires.
pub struct EnrichmentCachedAdapter {
    inner: SharedAdapter,
    client: reqwest::Client,
    timeout: Duration,
    cache: Cache<String, CachedEnrichment>,
}

impl EnrichmentCachedAdapter {
    /// Wrap `inner`, enriching through `client` and caching results for
    /// `ttl`, bounded to `max_capacity` entries.
    #[must_use]
    pub fn new(inner: SharedAdapter, client: reqwest::Client, timeout: Duration, ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .build();
        Self {
            inner,
            client,
            timeout,
            cache,
        }
    }

    async fn enrich_one(&self, listing: &mut aptwatch_types::Listing) {
        if listing.url.is_empty() {
            return;
        }
        if let Some(cached) = self.cache.get(&listing.url).await {
            listing.description = cached.description;
            listing.images = cached.images;
            return;
        }
        aptwatch_core::enrich(&self.client, listing, self.timeout).await;
        self.cache
            .insert(
                listing.url.clone(),
                CachedEnrichment {
                    description: listing.description.clone(),
                    images: listing.images.clone(),
                },
            )
            .await;
    }
}

#[async_trait]
#[aptwatch_macros::delegate_adapter_identity(inner)]
impl ProviderAdapter for EnrichmentCachedAdapter {
    async fn fetch(&self, query: &Query) -> AdapterResult {
        let result = self.inner.fetch(query).await;
        match result {
            AdapterResult::Items(mut items) => {
                for listing in &mut items {
                    self.enrich_one(listing).await;
                }
                AdapterResult::Items(items)
            }
            other => other,
        }
    }
}

/// Builder-facing middleware that installs an [`EnrichmentCachedAdapter`].
pub struct EnrichmentCache {
    client: reqwest::Client,
    timeout: Duration,
    ttl: Duration,
    max_capacity: u64,
}

impl EnrichmentCache {
    /// Create the cache layer with the given HTTP client, per-fetch timeout
    /// and cache TTL. `max_capacity` bounds memory use; entries beyond it are
    /// evicted least-recently-used.
    #[must_use]
    pub const fn new(client: reqwest::Client, timeout: Duration, ttl: Duration, max_capacity: u64) -> Self {
        Self {
            client,
            timeout,
            ttl,
            max_capacity,
        }
    }
}

impl Middleware for EnrichmentCache {
    fn apply(self: Box<Self>, inner: Arc<dyn ProviderAdapter>) -> Arc<dyn ProviderAdapter> {
        Arc::new(EnrichmentCachedAdapter::new(
            inner,
            self.client,
            self.timeout,
            self.ttl,
            self.max_capacity,
        ))
    }

    fn name(&self) -> &'static str {
        "EnrichmentCache"
    }

    fn config_json(&self) -> serde_json::Value {
        json!({
            "timeout_secs": self.timeout.as_secs(),
            "ttl_secs": self.ttl.as_secs(),
            "max_capacity": self.max_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptwatch_mock::fixtures;
    use aptwatch_mock::MockProviderAdapter;
    use std::sync::Arc as StdArc;

    #[tokio::test]
    async fn already_enriched_listings_are_untouched() {
        let listings = fixtures::immoscout24();
        let mock = StdArc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, listings.clone()));
        let cached = EnrichmentCachedAdapter::new(
            mock,
            reqwest::Client::new(),
            Duration::from_millis(10),
            Duration::from_secs(60),
            100,
        );

        let result = cached.fetch(&Query::for_city("Berlin")).await;
        let items = result.into_listings();
        assert_eq!(items.len(), listings.len());
        // Fixture listings already carry a description and image, so enrich
        // is a no-op and the cache is never populated.
        assert_eq!(cached.cache.entry_count(), 0);
    }
}
