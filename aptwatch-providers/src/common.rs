//! Helpers shared by every provider adapter: turning a raw actor-dataset
//! item into a normalized listing, and folding an [`IngestError`] from the
//! actor protocol into the adapter-level [`AdapterResult`] taxonomy (§7).

use aptwatch_core::{normalize, AdapterResult};
use aptwatch_types::listing::RawValue;
use aptwatch_types::source::SourceKey;
use aptwatch_types::IngestError;

/// Best-effort provider item identifier extraction, tried across the keys
/// the three actor-backed providers are observed to use.
#[must_use]
pub fn extract_external_id(raw: &RawValue) -> String {
    for key in ["id", "scoutId", "adId", "itemId", "externalId"] {
        if let Some(value) = raw.get(key).and_then(RawValue::to_text) {
            if !value.is_empty() {
                return value;
            }
        }
    }
    String::new()
}

/// Normalize every raw actor item into a [`AdapterResult::Items`], dropping
/// any item that fails the meaningful-content gate or carries no usable
/// identifier (the Provider Adapter contract forbids returning
/// partially-parsed items).
pub fn items_to_listings(
    source: SourceKey,
    items: Vec<serde_json::Value>,
    id_of: fn(&RawValue) -> String,
) -> AdapterResult {
    let listings = items
        .into_iter()
        .map(RawValue::from)
        .filter_map(|raw| {
            let id = id_of(&raw);
            normalize::normalize(source, &id, &raw)
        })
        .collect();
    AdapterResult::Items(listings)
}

/// Map a protocol-level error into the adapter result taxonomy described in
/// §4.1 and §7: transport failures carry the error through, everything else
/// the scheduler only needs to know the *shape* of.
#[must_use]
pub fn error_to_result(err: &IngestError) -> AdapterResult {
    match err {
        IngestError::Transport { .. } => AdapterResult::TransportError(err.clone()),
        IngestError::ProviderRejected { .. } | IngestError::ProviderQuota { .. } => {
            AdapterResult::RemoteRejected
        }
        _ => AdapterResult::RemoteEmpty,
    }
}
