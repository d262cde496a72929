//! Kleinanzeigen provider adapter.
//!
//! Simplest of the three: a single location-and-category URL, no fallback
//! cascade. Kleinanzeigen listings skew toward shared rooms and short-term
//! sublets, so no price/room filters are pushed into the URL itself —
//! filtering happens downstream in the Filter Matcher.

use std::any::Any;

use async_trait::async_trait;
use serde_json::json;

use aptwatch_core::{AdapterResult, ProviderAdapter};
use aptwatch_types::config::ProviderConfig;
use aptwatch_types::listing::Query;
use aptwatch_types::source::SourceKey;

use crate::actor::ActorClient;
use crate::common::{error_to_result, extract_external_id, items_to_listings};

/// Builds the single Kleinanzeigen search URL for `query`.
#[must_use]
pub fn build_search_url(query: &Query) -> String {
    let city_slug = query.city.to_lowercase().replace(' ', "-");
    format!("https://www.kleinanzeigen.de/s-wohnung-mieten/{city_slug}/c203")
}

/// Provider adapter for Kleinanzeigen, built on the shared actor-run protocol.
pub struct KleinanzeigenAdapter {
    client: ActorClient,
    config: ProviderConfig,
}

impl KleinanzeigenAdapter {
    /// Build a new adapter against `client` using `config`.
    #[must_use]
    pub const fn new(client: ActorClient, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ProviderAdapter for KleinanzeigenAdapter {
    fn source(&self) -> SourceKey {
        SourceKey::KLEINANZEIGEN
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
                SourceKey::KLEINANZEIGEN.as_str(),
                &self.config.actor_id,
                token,
                &body,
                self.config.run_mode,
                &self.config.retry,
            )
            .await
        {
            Ok(items) => items_to_listings(SourceKey::KLEINANZEIGEN, items, extract_external_id),
            Err(err) => error_to_result(&err),
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
    fn builds_city_scoped_url() {
        let query = Query::for_city("Leipzig");
        let url = build_search_url(&query);
        assert_eq!(url, "https://www.kleinanzeigen.de/s-wohnung-mieten/leipzig/c203");
    }
}
