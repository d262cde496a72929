//! Deterministic fixture listings, one small set per source, used by
//! [`crate::MockProviderAdapter::with_fixtures`] and the example binaries.

use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use aptwatch_types::listing::{Listing, RawValue};
use aptwatch_types::source::SourceKey;

fn listing(source: SourceKey, external_id: &str, title: &str, price: i64, rooms: i64, area: i64) -> Listing {
    Listing {
        source,
        external_id: external_id.to_string(),
        surrogate_id: format!("fixture_{source}_{external_id}"),
        title: title.to_string(),
        description: format!("{title} — a fixture listing used for deterministic tests."),
        price: Decimal::from(price),
        rooms: Decimal::from(rooms),
        area: Decimal::from(area),
        city: "Berlin".to_string(),
        district: Some("Mitte".to_string()),
        street: None,
        postal_code: Some("10115".to_string()),
        url: format!("https://example.test/{source}/{external_id}"),
        application_url: format!("https://example.test/{source}/{external_id}/apply"),
        images: vec![format!("https://example.test/{source}/{external_id}/1.jpg")],
        features: BTreeSet::from(["balcony".to_string()]),
        raw_payload: RawValue::Null,
        last_seen: Utc
            .with_ymd_and_hms(2026, 1, 1, 9, 0, 0)
            .single()
            .expect("valid fixture timestamp"),
    }
}

/// Three deterministic listings for the `ImmoScout24` fixture source.
#[must_use]
pub fn immoscout24() -> Vec<Listing> {
    vec![
        listing(SourceKey::IMMOSCOUT24, "is24-1", "Helle 2-Zimmer-Wohnung in Mitte", 950, 2, 62),
        listing(SourceKey::IMMOSCOUT24, "is24-2", "Ruhiges Studio nahe Alexanderplatz", 680, 1, 34),
        listing(SourceKey::IMMOSCOUT24, "is24-3", "Familienwohnung mit Balkon", 1450, 4, 98),
    ]
}

/// Two deterministic listings for the `Immowelt` fixture source.
#[must_use]
pub fn immowelt() -> Vec<Listing> {
    vec![
        listing(SourceKey::IMMOWELT, "iw-1", "Altbauwohnung mit Stuck in Prenzlauer Berg", 1200, 3, 80),
        listing(SourceKey::IMMOWELT, "iw-2", "Kompakte Single-Wohnung", 620, 1, 28),
    ]
}

/// One deterministic listing for the `Kleinanzeigen` fixture source.
#[must_use]
pub fn kleinanzeigen() -> Vec<Listing> {
    vec![listing(
        SourceKey::KLEINANZEIGEN,
        "ka-1",
        "WG-Zimmer in Friedrichshain, sofort frei",
        480,
        1,
        18,
    )]
}
