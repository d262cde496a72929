//! Source round-robin diversification for combined feeds.
//!
//! When a caller requests a combined feed (e.g. an on-demand query mixing
//! persisted listings with freshly fetched ones), naively concatenating
//! per-source result lists lets whichever source returned the most items
//! dominate the page. `round_robin_merge` instead pulls one item per source
//! bucket per round until the requested count is reached or every bucket is
//! exhausted, giving a stable, mixed ordering.

use crate::listing::Listing;
use crate::source::SourceKey;
use std::collections::BTreeMap;

/// Interleave listings from multiple sources, preserving each source's
/// internal ordering and visiting sources in the order they first appear.
///
/// Stops once `limit` items have been selected or every bucket is drained.
#[must_use]
pub fn round_robin_merge(items: Vec<Listing>, limit: usize) -> Vec<Listing> {
    if limit == 0 {
        return Vec::new();
    }

    let mut order: Vec<SourceKey> = Vec::new();
    let mut buckets: BTreeMap<&'static str, std::collections::VecDeque<Listing>> =
        BTreeMap::new();

    for item in items {
        let key = item.source;
        if !order.contains(&key) {
            order.push(key);
        }
        buckets.entry(key.as_str()).or_default().push_back(item);
    }

    let mut out = Vec::with_capacity(limit);
    let mut remaining: usize = buckets.values().map(std::collections::VecDeque::len).sum();
    'rounds: loop {
        if out.len() >= limit || remaining == 0 {
            break;
        }
        for source in &order {
            if out.len() >= limit {
                break 'rounds;
            }
            if let Some(bucket) = buckets.get_mut(source.as_str()) {
                if let Some(item) = bucket.pop_front() {
                    out.push(item);
                    remaining -= 1;
                }
            }
        }
    }
    out
}

/// Build a combined on-demand feed from persisted and freshly fetched live
/// listings: a persistence-first slice (half of `limit`, or fewer if
/// persistence has less to offer), backfilled to `limit` by
/// [`round_robin_merge`] over the live results alone (§4.6, §8 scenario 6).
///
/// Live listings already present in the persisted slice (by
/// `(source, external_id)`) are dropped before the live round-robin runs,
/// so the combined result never duplicates an item.
#[must_use]
pub fn combined_feed(mut persisted: Vec<Listing>, live: Vec<Listing>, limit: usize) -> Vec<Listing> {
    if limit == 0 {
        return Vec::new();
    }

    let persisted_share = (limit / 2).min(persisted.len());
    let picked_persisted: Vec<Listing> = persisted.drain(..persisted_share).collect();

    let seen: std::collections::HashSet<(SourceKey, String)> = picked_persisted
        .iter()
        .map(|l| (l.source, l.external_id.clone()))
        .collect();
    let live_candidates: Vec<Listing> = live
        .into_iter()
        .filter(|l| !seen.contains(&(l.source, l.external_id.clone())))
        .collect();

    let live_share = limit - picked_persisted.len();
    let mut out = picked_persisted;
    out.extend(round_robin_merge(live_candidates, live_share));
    out
}
