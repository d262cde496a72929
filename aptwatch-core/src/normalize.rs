//! The Listing Normalizer: projects a heterogeneous provider item
//! (represented as a [`RawValue`] dynamic tagged union) into the internal
//! [`Listing`] schema.
//!
//! Field extraction is table-driven: for each field, an ordered list of
//! probe strategies is tried in turn and the first one to produce a value
//! wins. Adding a new provider means adding probes to these tables, not
//! touching the rest of the core.

use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use rust_decimal::Decimal;
use sha1::{Digest, Sha1};
use url::Url;

use aptwatch_types::listing::RawValue;
use aptwatch_types::{Listing, SourceKey};

/// Canonical keys tried, in order, for the price field.
const PRICE_KEYS: &[&str] = &[
    "price",
    "rent",
    "coldRent",
    "totalRent",
    "baseRent",
    "netRent",
    "grossRent",
    "kaltmiete",
    "warmmiete",
];

/// Canonical keys tried, in order, for the rooms field.
const ROOMS_KEYS: &[&str] = &["rooms", "numberOfRooms", "zimmer"];

/// Canonical keys tried, in order, for the area field.
const AREA_KEYS: &[&str] = &["area", "livingSpace", "livingArea", "wohnflaeche", "qm"];

/// Nested wrapper keys checked under a canonical key, e.g. `price: {value: 1200}`.
const NESTED_SCALAR_KEYS: &[&str] = &["value", "amount", "formatted"];

/// First non-empty URL key wins.
const URL_KEYS: &[&str] = &[
    "applicationUrl",
    "adUrl",
    "detailUrl",
    "url",
    "link",
    "shareLink",
];

/// Keys that may hold an image/gallery collection.
const IMAGE_KEYS: &[&str] = &["images", "imageUrls", "photos", "gallery", "pictures", "media", "attachments"];

static PRICE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:kaltmiete|warmmiete)?\s*[:\-]?\s*([0-9][0-9.,\s]*)\s*(?:€|eur|euro)|(?:€|eur|euro)\s*([0-9][0-9.,\s]*)",
    )
    .expect("valid price regex")
});

static ROOMS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+(?:[.,][0-9]+)?)\s*(?:zimmer|zi\.?|rooms)").expect("valid rooms regex"));

static AREA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+(?:[.,][0-9]+)?)\s*(?:m²|m\^2|qm)").expect("valid area regex"));

fn probe_canonical_numeric(raw: &RawValue, keys: &[&str]) -> Option<Decimal> {
    for key in keys {
        let Some(value) = raw.get(key) else {
            continue;
        };
        if let Some(d) = value.to_decimal() {
            return Some(d);
        }
        for nested in NESTED_SCALAR_KEYS {
            if let Some(inner) = value.get(nested) {
                if let Some(d) = inner.to_decimal() {
                    return Some(d);
                }
            }
        }
    }
    None
}

/// `hardFacts.price`, `hardFacts.keyfacts[]`, `rawData.price` and similar
/// provider-specific structured blocks.
fn probe_structured_numeric(raw: &RawValue, field: &str) -> Option<Decimal> {
    if let Some(hard_facts) = raw.get("hardFacts") {
        if let Some(direct) = hard_facts.get(field).and_then(RawValue::to_decimal) {
            return Some(direct);
        }
        if let Some(facts) = hard_facts.get("facts") {
            for fact in facts.iter_array() {
                let matches_type = fact
                    .get("type")
                    .and_then(RawValue::as_str)
                    .is_some_and(|t| t.eq_ignore_ascii_case(field));
                if matches_type {
                    if let Some(v) = fact.get("splitValue").and_then(RawValue::to_decimal) {
                        return Some(v);
                    }
                }
            }
        }
        if let Some(keyfacts) = hard_facts.get("keyfacts") {
            for entry in keyfacts.iter_array() {
                if let Some(v) = entry.get(field).and_then(RawValue::to_decimal) {
                    return Some(v);
                }
            }
        }
    }
    if let Some(raw_data) = raw.get("rawData") {
        let alt_key = match field {
            "numberOfRooms" => "nbroom",
            "livingSpace" => "surface",
            other => other,
        };
        if let Some(v) = raw_data.get(alt_key).and_then(RawValue::to_decimal) {
            return Some(v);
        }
        if let Some(surface) = raw_data.get(alt_key).and_then(|v| v.get("main")) {
            if let Some(v) = surface.to_decimal() {
                return Some(v);
            }
        }
        if let Some(v) = raw_data.get(field).and_then(RawValue::to_decimal) {
            return Some(v);
        }
    }
    None
}

fn regex_sweep(re: &Regex, haystack: &str) -> Option<Decimal> {
    let caps = re.captures(haystack)?;
    let matched = caps
        .iter()
        .skip(1)
        .find_map(|m| m.map(|m| m.as_str()))?;
    aptwatch_types::numeric::parse_locale_decimal(matched)
}

fn extract_price(raw: &RawValue, title: &str, description: &str) -> Decimal {
    probe_canonical_numeric(raw, PRICE_KEYS)
        .or_else(|| probe_structured_numeric(raw, "price"))
        .or_else(|| regex_sweep(&PRICE_REGEX, &format!("{title} {description}")))
        .unwrap_or(Decimal::ZERO)
}

fn extract_rooms(raw: &RawValue, title: &str, description: &str) -> Decimal {
    probe_canonical_numeric(raw, ROOMS_KEYS)
        .or_else(|| probe_structured_numeric(raw, "numberOfRooms"))
        .or_else(|| regex_sweep(&ROOMS_REGEX, &format!("{title} {description}")))
        .unwrap_or(Decimal::ZERO)
}

fn extract_area(raw: &RawValue, title: &str, description: &str) -> Decimal {
    probe_canonical_numeric(raw, AREA_KEYS)
        .or_else(|| probe_structured_numeric(raw, "livingSpace"))
        .or_else(|| regex_sweep(&AREA_REGEX, &format!("{title} {description}")))
        .unwrap_or(Decimal::ZERO)
}

fn extract_text(raw: &RawValue, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| raw.get(k).and_then(RawValue::to_text))
        .filter(|s| !s.is_empty())
}

fn extract_address(raw: &RawValue) -> (String, Option<String>, Option<String>, Option<String>) {
    let address = raw.get("address");
    let city = address
        .and_then(|a| a.get("city"))
        .and_then(RawValue::to_text)
        .or_else(|| extract_text(raw, &["city"]))
        .or_else(|| {
            raw.get("location")
                .and_then(|l| l.get("address"))
                .and_then(|a| a.get("city"))
                .and_then(RawValue::to_text)
        })
        .unwrap_or_default();
    let district = address
        .and_then(|a| a.get("district"))
        .and_then(RawValue::to_text)
        .or_else(|| extract_text(raw, &["district", "quarter"]));
    let street = address
        .and_then(|a| a.get("street"))
        .and_then(RawValue::to_text)
        .or_else(|| extract_text(raw, &["street"]));
    let postal_code = address
        .and_then(|a| a.get("postalCode").or_else(|| a.get("zipCode")))
        .and_then(RawValue::to_text)
        .or_else(|| extract_text(raw, &["postalCode", "zipCode"]));
    (city, district, street, postal_code)
}

fn absolutize(raw: &str, canonical: &Url) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    if let Some(stripped) = raw.strip_prefix("//") {
        return Some(format!("{}://{stripped}", canonical.scheme()));
    }
    if raw.starts_with('/') {
        let host = canonical.host_str()?;
        return Some(format!("{}://{host}{raw}", canonical.scheme()));
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }
    None
}

fn extract_images(raw: &RawValue, canonical: &Url) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    for key in IMAGE_KEYS {
        let Some(value) = raw.get(key) else { continue };
        let candidates: Vec<&RawValue> = if matches!(value, RawValue::Array(_)) {
            value.iter_array().collect()
        } else {
            vec![value]
        };
        for candidate in candidates {
            let url_str = candidate
                .as_str()
                .map(str::to_string)
                .or_else(|| candidate.get("url").and_then(RawValue::to_text));
            let Some(url_str) = url_str else { continue };
            let Some(absolute) = absolutize(&url_str, canonical) else {
                continue;
            };
            if seen.insert(absolute.clone()) {
                out.push(absolute);
                if out.len() >= 10 {
                    return out;
                }
            }
        }
    }
    out
}

fn extract_url(raw: &RawValue, source: SourceKey, external_id: &str) -> Option<String> {
    if let Some(found) = extract_text(raw, URL_KEYS) {
        return Some(found);
    }
    if source == SourceKey::IMMOSCOUT24 && !external_id.is_empty() {
        return Some(format!(
            "https://www.immobilienscout24.de/expose/{external_id}"
        ));
    }
    None
}

fn surrogate_id(source: SourceKey, url: &str, external_id: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(source.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());
    hasher.update(b"|");
    hasher.update(external_id.as_bytes());
    let digest = hasher.finalize();
    let hex = format!("{digest:x}");
    format!("apify_{}_{}", source.as_str(), &hex[..20.min(hex.len())])
}

/// Project a raw provider item into a [`Listing`], or `None` if the item
/// fails the meaningful-content retention rule.
///
/// `external_id` must already be extracted by the caller (providers vary in
/// where they keep their own identifier, so this is left to the adapter,
/// which knows its own payload's identity field).
#[must_use]
pub fn normalize(source: SourceKey, external_id: &str, raw: &RawValue) -> Option<Listing> {
    let title = extract_text(raw, &["title", "name", "headline"]).unwrap_or_default();
    let description = extract_text(raw, &["description", "desc", "text"]).unwrap_or_default();
    let price = extract_price(raw, &title, &description);
    let rooms = extract_rooms(raw, &title, &description);
    let area = extract_area(raw, &title, &description);
    let (city, district, street, postal_code) = extract_address(raw);
    let url = extract_url(raw, source, external_id).unwrap_or_default();

    let canonical = Url::parse(&url).ok();
    let images = canonical
        .as_ref()
        .map(|c| extract_images(raw, c))
        .unwrap_or_default();

    let application_url = extract_text(raw, &["applicationUrl"]).unwrap_or_else(|| url.clone());

    let features: BTreeSet<String> = raw
        .get("features")
        .or_else(|| raw.get("tags"))
        .map(|v| {
            v.iter_array()
                .filter_map(RawValue::to_text)
                .collect::<BTreeSet<_>>()
        })
        .unwrap_or_default();

    let listing = Listing {
        source,
        external_id: external_id.to_string(),
        surrogate_id: surrogate_id(source, &url, external_id),
        title,
        description,
        price,
        rooms,
        area,
        city,
        district,
        street,
        postal_code,
        url: url.clone(),
        application_url,
        images,
        features,
        raw_payload: raw.clone(),
        last_seen: Utc::now(),
    };

    if listing.has_meaningful_content() {
        Some(listing)
    } else {
        None
    }
}

/// Best-effort, time-bounded description/image enrichment (§4.2).
///
/// Only runs when the listing is missing a description or has no images and
/// a canonical URL is present. Failure is silent: the listing is returned
/// unchanged if the fetch, parse, or timeout fails.
pub async fn enrich(client: &reqwest::Client, listing: &mut Listing, timeout: Duration) {
    if !listing.description.is_empty() && !listing.images.is_empty() {
        return;
    }
    if listing.url.is_empty() {
        return;
    }
    let Ok(Some(html)) = tokio::time::timeout(timeout, fetch_html(client, &listing.url)).await
    else {
        return;
    };

    let Ok(canonical) = Url::parse(&listing.url) else {
        return;
    };

    let document = scraper::Html::parse_document(&html);

    if listing.images.is_empty() {
        listing.images = extract_html_images(&document, &canonical);
    }
    if listing.description.is_empty() {
        if let Some(desc) = extract_html_description(&document) {
            listing.description = desc;
        }
    }
}

async fn fetch_html(client: &reqwest::Client, url: &str) -> Option<String> {
    let resp = client.get(url).send().await.ok()?;
    resp.text().await.ok()
}

fn extract_html_images(document: &scraper::Html, canonical: &Url) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();

    let meta_selectors = [
        r#"meta[property="og:image"]"#,
        r#"meta[property="og:image:secure_url"]"#,
        r#"meta[name="twitter:image"]"#,
    ];
    for sel in meta_selectors {
        let Ok(selector) = scraper::Selector::parse(sel) else {
            continue;
        };
        for el in document.select(&selector) {
            if let Some(content) = el.value().attr("content") {
                if let Some(abs) = absolutize(content, canonical) {
                    if seen.insert(abs.clone()) {
                        out.push(abs);
                    }
                }
            }
        }
    }

    if let Ok(img_selector) = scraper::Selector::parse("img") {
        for el in document.select(&img_selector) {
            let src = el
                .value()
                .attr("src")
                .or_else(|| el.value().attr("data-src"));
            if let Some(src) = src {
                if let Some(abs) = absolutize(src, canonical) {
                    if seen.insert(abs.clone()) {
                        out.push(abs);
                    }
                }
            }
        }
    }

    out.truncate(10);
    out
}

fn extract_html_description(document: &scraper::Html) -> Option<String> {
    if let Ok(selector) = scraper::Selector::parse(r#"script[type="application/ld+json"]"#) {
        for el in document.select(&selector) {
            let text = el.text().collect::<String>();
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                if let Some(desc) = value.get("description").and_then(|v| v.as_str()) {
                    if !desc.is_empty() {
                        return Some(desc.to_string());
                    }
                }
            }
        }
    }
    if let Ok(selector) = scraper::Selector::parse(r#"meta[property="og:description"]"#) {
        if let Some(el) = document.select(&selector).next() {
            if let Some(content) = el.value().attr("content") {
                if !content.is_empty() {
                    return Some(content.to_string());
                }
            }
        }
    }
    if let Ok(selector) = scraper::Selector::parse(r#"meta[name="description"]"#) {
        if let Some(el) = document.select(&selector).next() {
            if let Some(content) = el.value().attr("content") {
                if !content.is_empty() {
                    return Some(content.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn map(pairs: Vec<(&str, RawValue)>) -> RawValue {
        let mut m = BTreeMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v);
        }
        RawValue::Map(m)
    }

    #[test]
    fn discards_item_with_no_meaningful_content() {
        let raw = map(vec![
            ("title", RawValue::String("Apt".into())),
            ("description", RawValue::String(String::new())),
            ("url", RawValue::String(String::new())),
        ]);
        assert!(normalize(SourceKey::IMMOWELT, "1", &raw).is_none());
    }

    #[test]
    fn accepts_item_with_price_and_url_only() {
        let raw = map(vec![
            ("title", RawValue::String("Wohnung".into())),
            ("price", RawValue::Number(Decimal::from(1200))),
            ("url", RawValue::String("https://example.com/a".into())),
        ]);
        let listing = normalize(SourceKey::IMMOWELT, "1", &raw).expect("should normalize");
        assert_eq!(listing.price, Decimal::from(1200));
        assert_eq!(listing.rooms, Decimal::ZERO);
    }

    #[test]
    fn surrogate_id_is_stable_across_runs() {
        let raw = map(vec![
            ("title", RawValue::String("Wohnung".into())),
            ("price", RawValue::Number(Decimal::from(900))),
            ("url", RawValue::String("https://example.com/b".into())),
        ]);
        let a = normalize(SourceKey::IMMOWELT, "42", &raw).unwrap();
        let b = normalize(SourceKey::IMMOWELT, "42", &raw).unwrap();
        assert_eq!(a.surrogate_id, b.surrogate_id);
    }

    #[test]
    fn immoscout_synthesizes_url_from_id() {
        let raw = map(vec![
            ("title", RawValue::String("Helle 3-Zimmer Wohnung".into())),
            ("price", RawValue::Number(Decimal::from(1500))),
        ]);
        let listing = normalize(SourceKey::IMMOSCOUT24, "123456789", &raw).unwrap();
        assert_eq!(
            listing.url,
            "https://www.immobilienscout24.de/expose/123456789"
        );
    }

    #[test]
    fn regex_sweep_extracts_price_from_title() {
        let raw = map(vec![(
            "title",
            RawValue::String("Schöne Wohnung, Kaltmiete: 950 €".into()),
        )]);
        let price = extract_price(&raw, "Schöne Wohnung, Kaltmiete: 950 €", "");
        assert_eq!(price, Decimal::from(950));
    }

    #[test]
    fn regex_sweep_extracts_rooms_and_area() {
        let text = "Gemütliche 3 Zimmer Wohnung mit 75 m² Wohnfläche";
        let raw = RawValue::Null;
        assert_eq!(extract_rooms(&raw, text, ""), Decimal::from(3));
        assert_eq!(extract_area(&raw, text, ""), Decimal::from(75));
    }

    #[test]
    fn structured_block_wins_over_regex() {
        let raw = map(vec![(
            "hardFacts",
            map(vec![(
                "facts",
                RawValue::Array(vec![map(vec![
                    ("type", RawValue::String("numberOfRooms".into())),
                    ("splitValue", RawValue::Number(Decimal::from(2))),
                ])]),
            )]),
        )]);
        assert_eq!(extract_rooms(&raw, "4 Zimmer im Titel", ""), Decimal::from(2));
    }
}
