//! Immowelt provider adapter.
//!
//! Input assembly follows the three-tier fallback cascade described in
//! §4.1 step 2: a full-filter URL, then a relaxed URL dropping minimum
//! bounds, then a location-only URL. The cascade stops at the first tier
//! that returns at least one item (§8 scenario 5).

use std::any::Any;

use async_trait::async_trait;
use serde_json::json;

use aptwatch_core::{AdapterResult, ProviderAdapter};
use aptwatch_types::config::ProviderConfig;
use aptwatch_types::listing::Query;
use aptwatch_types::source::SourceKey;

use crate::actor::ActorClient;
use crate::common::{error_to_result, extract_external_id, items_to_listings};

fn city_slug(city: &str) -> String {
    city.to_lowercase().replace(' ', "-")
}

/// Tier (a): the full filter URL, every set bound included.
#[must_use]
pub fn full_filter_url(query: &Query) -> String {
    let mut params = Vec::new();
    if let Some(v) = query.price_min {
        params.push(format!("priceMin={v}"));
    }
    if let Some(v) = query.price_max {
        params.push(format!("priceMax={v}"));
    }
    if let Some(v) = query.rooms_min {
        params.push(format!("roomsMin={v}"));
    }
    if let Some(v) = query.rooms_max {
        params.push(format!("roomsMax={v}"));
    }
    if let Some(v) = query.area_min {
        params.push(format!("areaMin={v}"));
    }
    if let Some(v) = query.area_max {
        params.push(format!("areaMax={v}"));
    }
    format!(
        "https://www.immowelt.de/classified-search/{}?{}",
        city_slug(&query.city),
        params.join("&")
    )
}

/// Tier (b): the relaxed URL, minimum bounds dropped (maximums retained).
#[must_use]
pub fn relaxed_url(query: &Query) -> String {
    let mut params = Vec::new();
    if let Some(v) = query.price_max {
        params.push(format!("priceMax={v}"));
    }
    if let Some(v) = query.rooms_max {
        params.push(format!("roomsMax={v}"));
    }
    if let Some(v) = query.area_max {
        params.push(format!("areaMax={v}"));
    }
    format!(
        "https://www.immowelt.de/classified-search/{}?{}",
        city_slug(&query.city),
        params.join("&")
    )
}

/// Tier (c): location-only, no filter parameters at all.
#[must_use]
pub fn location_only_url(query: &Query) -> String {
    format!("https://www.immowelt.de/classified-search/{}", city_slug(&query.city))
}

/// Provider adapter for Immowelt, built on the shared actor-run protocol.
pub struct ImmoweltAdapter {
    client: ActorClient,
    config: ProviderConfig,
}

impl ImmoweltAdapter {
    /// Build a new adapter against `client` using `config`.
    #[must_use]
    pub const fn new(client: ActorClient, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    async fn run_tier(&self, token: &str, start_url: &str) -> Result<Vec<serde_json::Value>, aptwatch_types::IngestError> {
        let body = json!({
            "startUrls": [{ "url": start_url }],
            "maxPagesToScrape": self.config.max_pages,
            "maxItems": self.config.max_items,
        });
        self.client
            .run_with_retry(
                SourceKey::IMMOWELT.as_str(),
                &self.config.actor_id,
                token,
                &body,
                self.config.run_mode,
                &self.config.retry,
            )
            .await
    }
}

#[async_trait]
impl ProviderAdapter for ImmoweltAdapter {
    fn source(&self) -> SourceKey {
        SourceKey::IMMOWELT
    }

    async fn fetch(&self, query: &Query) -> AdapterResult {
        if !self.config.enabled {
            return AdapterResult::RemoteEmpty;
        }
        let Some(token) = self.config.token.as_deref() else {
            return AdapterResult::RemoteEmpty;
        };

        let tiers = [
            full_filter_url(query),
            relaxed_url(query),
            location_only_url(query),
        ];

        let mut last_err: Option<aptwatch_types::IngestError> = None;
        for tier_url in &tiers {
            match self.run_tier(token, tier_url).await {
                Ok(items) if items.is_empty() => {
                    // Empty result at this tier: fall through to the next,
                    // widest tier per the cascade contract.
                    continue;
                }
                Ok(items) => {
                    return items_to_listings(SourceKey::IMMOWELT, items, extract_external_id);
                }
                Err(e) => {
                    last_err = Some(e);
                }
            }
        }

        last_err.as_ref().map_or(AdapterResult::RemoteEmpty, error_to_result)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn full_filter_includes_every_bound() {
        let mut query = Query::for_city("Berlin");
        query.price_min = Some(Decimal::from(500));
        query.price_max = Some(Decimal::from(1500));
        let url = full_filter_url(&query);
        assert!(url.contains("priceMin=500"));
        assert!(url.contains("priceMax=1500"));
    }

    #[test]
    fn relaxed_drops_minimum_bounds() {
        let mut query = Query::for_city("Berlin");
        query.price_min = Some(Decimal::from(500));
        query.price_max = Some(Decimal::from(1500));
        let url = relaxed_url(&query);
        assert!(!url.contains("priceMin"));
        assert!(url.contains("priceMax=1500"));
    }

    #[test]
    fn location_only_has_no_query_params() {
        let query = Query::for_city("Berlin");
        let url = location_only_url(&query);
        assert!(!url.contains('?'));
        assert!(url.ends_with("/berlin"));
    }
}
