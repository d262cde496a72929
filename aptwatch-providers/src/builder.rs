//! Convenience constructors wiring a provider's raw adapter into the
//! standard middleware stack (cooldown gate, soft-failure guard, enrichment
//! cache) via [`aptwatch_middleware::AdapterBuilder`].

use std::sync::Arc;
use std::time::Duration;

use aptwatch_core::{IngestError, ProviderAdapter};
use aptwatch_middleware::AdapterBuilder;
use aptwatch_types::config::ProviderConfig;

use crate::actor::ActorClient;
use crate::immoscout::ImmoScout24Adapter;
use crate::immowelt::ImmoweltAdapter;
use crate::kleinanzeigen::KleinanzeigenAdapter;

/// Build the fully wrapped `ImmoScout24` adapter: `EnrichmentCache` ->
/// `SoftFailureGuard` -> `CooldownGate` -> raw adapter.
///
/// # Errors
/// Returns an error if the middleware stack fails validation.
pub fn build_immoscout24(
    http: reqwest::Client,
    base_url: &str,
    config: ProviderConfig,
    enrichment: &aptwatch_types::config::EnrichmentConfig,
) -> Result<Arc<dyn ProviderAdapter>, IngestError> {
    let raw: Arc<dyn ProviderAdapter> = Arc::new(ImmoScout24Adapter::new(
        ActorClient::new(http.clone(), base_url),
        config.clone(),
    ));
    wrap(raw, http, config, enrichment)
}

/// Build the fully wrapped Immowelt adapter (same ordering as
/// [`build_immoscout24`]).
///
/// # Errors
/// Returns an error if the middleware stack fails validation.
pub fn build_immowelt(
    http: reqwest::Client,
    base_url: &str,
    config: ProviderConfig,
    enrichment: &aptwatch_types::config::EnrichmentConfig,
) -> Result<Arc<dyn ProviderAdapter>, IngestError> {
    let raw: Arc<dyn ProviderAdapter> = Arc::new(ImmoweltAdapter::new(
        ActorClient::new(http.clone(), base_url),
        config.clone(),
    ));
    wrap(raw, http, config, enrichment)
}

/// Build the fully wrapped Kleinanzeigen adapter (same ordering as
/// [`build_immoscout24`]).
///
/// # Errors
/// Returns an error if the middleware stack fails validation.
pub fn build_kleinanzeigen(
    http: reqwest::Client,
    base_url: &str,
    config: ProviderConfig,
    enrichment: &aptwatch_types::config::EnrichmentConfig,
) -> Result<Arc<dyn ProviderAdapter>, IngestError> {
    let raw: Arc<dyn ProviderAdapter> = Arc::new(KleinanzeigenAdapter::new(
        ActorClient::new(http.clone(), base_url),
        config.clone(),
    ));
    wrap(raw, http, config, enrichment)
}

fn wrap(
    raw: Arc<dyn ProviderAdapter>,
    http: reqwest::Client,
    config: ProviderConfig,
    enrichment: &aptwatch_types::config::EnrichmentConfig,
) -> Result<Arc<dyn ProviderAdapter>, IngestError> {
    let mut builder = AdapterBuilder::new(raw)
        .with_cooldown(config.cooldown)
        .with_soft_failure_guard(Duration::from_secs(15 * 60));
    if enrichment.enabled {
        builder = builder.with_enrichment_cache(http, enrichment.timeout, enrichment.cache_ttl, 500);
    }
    builder.build()
}
