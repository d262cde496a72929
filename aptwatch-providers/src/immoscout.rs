//! `ImmobilienScout24` provider adapter.
//!
//! Input assembly is the simplest of the three providers (§4.1 step 2): the
//! query is translated into a single search URL and handed to the actor
//! service as-is, with no fallback cascade.

use std::any::Any;
use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::json;

use aptwatch_core::{AdapterResult, ProviderAdapter};
use aptwatch_types::config::ProviderConfig;
use aptwatch_types::listing::Query;
use aptwatch_types::source::SourceKey;

use crate::actor::ActorClient;
use crate::common::{extract_external_id, items_to_listings};

/// Builds the single `ImmoScout24` search URL for `query`.
#[must_use]
pub fn build_search_url(query: &Query) -> String {
    let city_slug = query.city.to_lowercase().replace(' ', "-");
    let mut url = format!(
        "https://www.immobilienscout24.de/Suche/de/{city_slug}/wohnung-mieten?"
    );
    let mut params = Vec::new();
    if let Some(min) = query.price_min {
        params.push(format!("price=/{min}"));
    }
    if let Some(max) = query.price_max {
        params.push(format!("price={max}/"));
    }
    if let Some(min) = query.rooms_min {
        params.push(format!("numberofrooms={min}/"));
    }
    if let Some(max) = query.rooms_max {
        params.push(format!("numberofrooms=/{max}"));
    }
    let _ = write!(url, "{}", params.join("&"));
    url
}

/// Provider adapter for `ImmobilienScout24`, built on the shared
/// actor-run protocol.
pub struct ImmoScout24Adapter {
    client: ActorClient,
    config: ProviderConfig,
}

impl ImmoScout24Adapter {
    /// Build a new adapter against `client` using `config`.
    #[must_use]
    pub const fn new(client: ActorClient, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ProviderAdapter for ImmoScout24Adapter {
    fn source(&self) -> SourceKey {
        SourceKey::IMMOSCOUT24
    }

    async fn fetch(&self, query: &Query) -> AdapterResult {
        if !self.config.enabled {
            return AdapterResult::RemoteEmpty;
        }
        let Some(token) = self.config.token.as_deref() else {
            return AdapterResult::RemoteEmpty;
        };

        let start_url = build_search_url(query);
        let body = json!({
            "startUrls": [{ "url": start_url }],
            "maxPagesToScrape": self.config.max_pages,
            "maxItems": self.config.max_items,
        });

        match self
            .client
            .run_with_retry(
                SourceKey::IMMOSCOUT24.as_str(),
                &self.config.actor_id,
                token,
                &body,
                self.config.run_mode,
                &self.config.retry,
            )
            .await
        {
            Ok(items) => items_to_listings(SourceKey::IMMOSCOUT24, items, extract_external_id),
            Err(err) => crate::common::error_to_result(&err),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_url_from_city_only() {
        let query = Query::for_city("Berlin");
        let url = build_search_url(&query);
        assert!(url.starts_with("https://www.immobilienscout24.de/Suche/de/berlin/wohnung-mieten?"));
    }

    #[test]
    fn includes_price_and_rooms_bounds() {
        let mut query = Query::for_city("Hamburg");
        query.price_max = Some(rust_decimal::Decimal::from(1500));
        query.rooms_min = Some(rust_decimal::Decimal::from(2));
        let url = build_search_url(&query);
        assert!(url.contains("price=1500/"));
        assert!(url.contains("numberofrooms=2/"));
    }
}
