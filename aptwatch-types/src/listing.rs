//! The normalized listing schema and the dynamic value used to represent
//! heterogeneous, loosely-typed provider payloads before normalization.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::source::SourceKey;

/// A normalized search query handed to a [`ProviderAdapter`](crate) and to
/// the Filter Matcher.
///
/// Optional bounds are `None` when unset; callers must not conflate an unset
/// bound with a zero bound (the source data occasionally confuses the two,
/// see the design notes — this type makes "set vs unset" explicit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// City to search within.
    pub city: String,
    /// Minimum acceptable price, inclusive, in euro.
    pub price_min: Option<Decimal>,
    /// Maximum acceptable price, inclusive, in euro.
    pub price_max: Option<Decimal>,
    /// Minimum acceptable number of rooms, inclusive.
    pub rooms_min: Option<Decimal>,
    /// Maximum acceptable number of rooms, inclusive.
    pub rooms_max: Option<Decimal>,
    /// Minimum acceptable living area, inclusive, in m².
    pub area_min: Option<Decimal>,
    /// Maximum acceptable living area, inclusive, in m².
    pub area_max: Option<Decimal>,
    /// If true, instructs adapters to bypass their cooldown gate exactly once.
    pub bypass_cooldown: bool,
    /// Whether the enqueuer is currently inside the configured quiet-hours
    /// window; cooldown-gating middleware scales its window accordingly.
    pub is_quiet_hours: bool,
}

impl Query {
    /// Build a query for a city with every bound left unset.
    #[must_use]
    pub fn for_city(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            price_min: None,
            price_max: None,
            rooms_min: None,
            rooms_max: None,
            area_min: None,
            area_max: None,
            bypass_cooldown: false,
            is_quiet_hours: false,
        }
    }

    /// Return a copy of this query overridden to target `city`.
    #[must_use]
    pub fn with_city(&self, city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            ..self.clone()
        }
    }
}

/// A normalized property advertisement.
///
/// Identity is `(source, external_id)`; the `surrogate_id` is a stable hash
/// derived from `(source, canonical_url, external_id)` and never changes
/// across re-ingestions of the same upstream item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Upstream provider this listing was ingested from.
    pub source: SourceKey,
    /// The provider's own identifier for this item.
    pub external_id: String,
    /// Stable deterministic identifier local to this system.
    pub surrogate_id: String,
    /// Listing headline.
    pub title: String,
    /// Free-text description, possibly long, possibly empty.
    pub description: String,
    /// Monthly rent/price in euro; 0 means "unknown/on-request".
    pub price: Decimal,
    /// Number of rooms; 0 means "unknown".
    pub rooms: Decimal,
    /// Living area in m²; 0 means "unknown".
    pub area: Decimal,
    /// City name.
    pub city: String,
    /// District/neighborhood, if known.
    pub district: Option<String>,
    /// Street address, if known.
    pub street: Option<String>,
    /// Postal code, if known.
    pub postal_code: Option<String>,
    /// Canonical detail-page URL for this listing.
    pub url: String,
    /// URL to use for an "apply now" action; defaults to `url`.
    pub application_url: String,
    /// Ordered, deduplicated, absolute image URLs, capped at 10.
    pub images: Vec<String>,
    /// Short descriptive tags (e.g. "balcony", "furnished").
    pub features: BTreeSet<String>,
    /// Opaque payload preserved for audit/debug purposes only.
    pub raw_payload: RawValue,
    /// Timestamp of the most recent ingestion that touched this row.
    pub last_seen: DateTime<Utc>,
}

impl Listing {
    /// The "meaningful content" retention predicate (§4.2 of the listing
    /// normalizer's field-extraction contract): a listing lacking every
    /// strong signal is not worth keeping.
    #[must_use]
    pub fn has_meaningful_content(&self) -> bool {
        let has_price = self.price > Decimal::ZERO;
        let has_rooms = self.rooms > Decimal::ZERO;
        let has_area = self.area > Decimal::ZERO;
        let has_title = self.title.chars().count() > 10;
        let has_description = self.description.chars().count() > 20;
        let has_url = !self.url.is_empty();
        has_price || has_rooms || has_area || has_title || has_description || has_url
    }
}

/// A dynamic, tagged-union value used to represent an unparsed provider item
/// before it passes through the Listing Normalizer.
///
/// Provider payloads vary wildly in shape; this type absorbs that diversity
/// so the field-probe extraction rules can walk arbitrary nesting without
/// committing to any one provider's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Absence of a value (JSON `null`, missing key).
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// A numeric scalar, kept as a decimal to avoid float rounding surprises.
    Number(Decimal),
    /// A string scalar.
    String(String),
    /// An ordered sequence of values.
    Array(Vec<RawValue>),
    /// An ordered string-keyed map of values (order preserved for stable
    /// first-match field-probing).
    Map(BTreeMap<String, RawValue>),
}

impl From<serde_json::Value> for RawValue {
    /// Convert an arbitrary JSON value (typically a decoded actor-run item)
    /// into the dynamic tagged union the field-probe extraction rules walk.
    ///
    /// Numbers that do not fit a [`Decimal`] (e.g. `NaN`-adjacent floats from
    /// a malformed payload) degrade to their string representation rather
    /// than being dropped, so a downstream regex sweep still has a chance.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .to_string()
                .parse::<Decimal>()
                .map_or_else(|_| Self::String(n.to_string()), Self::Number),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl RawValue {
    /// Look up a key on a [`RawValue::Map`]; returns `None` for any other
    /// variant or a missing key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// Index into a [`RawValue::Array`]; returns `None` otherwise.
    #[must_use]
    pub fn index(&self, i: usize) -> Option<&Self> {
        match self {
            Self::Array(a) => a.get(i),
            _ => None,
        }
    }

    /// Best-effort conversion to a borrowed string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Best-effort conversion to an owned string, coercing scalars.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Best-effort conversion to a decimal, accepting numeric strings with
    /// thousands separators and comma decimals (German locale formatting).
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => crate::numeric::parse_locale_decimal(s),
            _ => None,
        }
    }

    /// Iterate over a [`RawValue::Array`]; yields nothing for any other variant.
    pub fn iter_array(&self) -> impl Iterator<Item = &Self> {
        static EMPTY: &[RawValue] = &[];
        match self {
            Self::Array(a) => a.iter(),
            _ => EMPTY.iter(),
        }
    }
}
