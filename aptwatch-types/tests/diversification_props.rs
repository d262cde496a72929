use aptwatch_types::diversification::round_robin_merge;
use aptwatch_types::listing::{Listing, RawValue};
use aptwatch_types::source::SourceKey;
use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

const SOURCES: [SourceKey; 3] = [
    SourceKey::IMMOSCOUT24,
    SourceKey::IMMOWELT,
    SourceKey::KLEINANZEIGEN,
];

fn listing(source: SourceKey, id: usize) -> Listing {
    Listing {
        source,
        external_id: id.to_string(),
        surrogate_id: format!("apify_{}_{id}", source.as_str()),
        title: "Wohnung".into(),
        description: String::new(),
        price: Decimal::ZERO,
        rooms: Decimal::ZERO,
        area: Decimal::ZERO,
        city: "Berlin".into(),
        district: None,
        street: None,
        postal_code: None,
        url: format!("https://example.com/{}/{id}", source.as_str()),
        application_url: format!("https://example.com/{}/{id}", source.as_str()),
        images: Vec::new(),
        features: BTreeSet::new(),
        raw_payload: RawValue::Null,
        last_seen: Utc::now(),
    }
}

fn arb_items() -> impl Strategy<Value = Vec<Listing>> {
    proptest::collection::vec((0..3usize, 0usize..30), 0..60).prop_map(|picks| {
        picks
            .into_iter()
            .enumerate()
            .map(|(i, (source_idx, _))| listing(SOURCES[source_idx], i))
            .collect()
    })
}

proptest! {
    #[test]
    fn never_exceeds_limit_or_input_len(items in arb_items(), limit in 0usize..40) {
        let total = items.len();
        let merged = round_robin_merge(items, limit);
        prop_assert!(merged.len() <= limit);
        prop_assert!(merged.len() <= total);
    }

    #[test]
    fn drains_every_bucket_when_limit_is_unbounded(items in arb_items()) {
        let total = items.len();
        let merged = round_robin_merge(items, usize::MAX);
        prop_assert_eq!(merged.len(), total);
    }

    #[test]
    fn never_duplicates_a_surrogate_id(items in arb_items(), limit in 0usize..40) {
        let merged = round_robin_merge(items, limit);
        let mut seen = std::collections::HashSet::new();
        for listing in &merged {
            prop_assert!(seen.insert(listing.surrogate_id.clone()));
        }
    }

    #[test]
    fn preserves_each_sources_internal_order(items in arb_items()) {
        let mut per_source: std::collections::HashMap<&'static str, Vec<usize>> = std::collections::HashMap::new();
        for item in &items {
            let id: usize = item.external_id.parse().unwrap();
            per_source.entry(item.source.as_str()).or_default().push(id);
        }
        let merged = round_robin_merge(items, usize::MAX);
        let mut seen_per_source: std::collections::HashMap<&'static str, Vec<usize>> = std::collections::HashMap::new();
        for item in &merged {
            let id: usize = item.external_id.parse().unwrap();
            seen_per_source.entry(item.source.as_str()).or_default().push(id);
        }
        prop_assert_eq!(per_source, seen_per_source);
    }
}
