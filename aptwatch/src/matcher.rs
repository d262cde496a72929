//! The Filter Matcher (§4.4): decides whether a normalized [`Listing`]
//! satisfies a user's [`UserFilter`].
//!
//! Ported field-for-field from the original `_matches_user_filters`, with one
//! deliberate deviation (§9): city is a case-insensitive substring match
//! tried in both directions, numeric bounds constrain the match only when
//! the *listing's* value is known (`> 0` — missing data must never suppress
//! a match), and keywords are scored but never used to reject a listing —
//! the keyword list is a ranking hint for the messaging layer, not a gate.
//! Unlike the source this was migrated from, a filter bound is read as an
//! explicit `Option` rather than by truthiness, so a bound set to `0` still
//! constrains instead of silently behaving as "unset".

use rust_decimal::Decimal;

use aptwatch_types::Listing;

use crate::entities::UserFilter;

/// Whether `listing` satisfies `filter`.
///
/// Evaluates city, then price, then rooms, then area, short-circuiting on
/// the first rejection; keywords are never consulted here (see module
/// docs).
#[must_use]
pub fn matches(listing: &Listing, filter: &UserFilter) -> bool {
    if let Some(city) = filter.city.as_ref().filter(|c| !c.is_empty()) {
        let city = city.to_lowercase();
        let listing_city = listing.city.to_lowercase();
        if !listing_city.contains(&city) && !city.contains(&listing_city) {
            return false;
        }
    }

    if !bound_ok(listing.price, filter.price_min, filter.price_max) {
        return false;
    }
    if !bound_ok(listing.rooms, filter.rooms_min, filter.rooms_max) {
        return false;
    }
    if !bound_ok(listing.area, filter.area_min, filter.area_max) {
        return false;
    }

    true
}

/// The check only applies when `value` itself is known (`> 0`); missing
/// listing data must never suppress a match (§4.4). Once it applies, `min`
/// and `max` are read as explicit set-vs-unset `Option`s rather than by
/// truthiness, so a filter bound explicitly set to zero still constrains —
/// unlike the source this was migrated from, where a falsy `price_min`
/// was indistinguishable from an absent one (§9).
fn bound_ok(value: Decimal, min: Option<Decimal>, max: Option<Decimal>) -> bool {
    if value <= Decimal::ZERO {
        return true;
    }
    if let Some(min) = min {
        if value < min {
            return false;
        }
    }
    if let Some(max) = max {
        if value > max {
            return false;
        }
    }
    true
}

/// How many of a filter's keywords appear (case-insensitively) in the
/// listing's title or description. Used by the messaging/ranking layer to
/// surface better matches first; never used to reject (§4.4).
#[must_use]
pub fn keyword_score(listing: &Listing, filter: &UserFilter) -> usize {
    if filter.keywords.is_empty() {
        return 0;
    }
    let haystack = format!(
        "{} {}",
        listing.title.to_lowercase(),
        listing.description.to_lowercase()
    );
    filter
        .keywords
        .iter()
        .filter(|kw| !kw.is_empty() && haystack.contains(&kw.to_lowercase()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptwatch_mock::fixtures;

    fn berlin_listing() -> Listing {
        fixtures::immoscout24().into_iter().next().unwrap()
    }

    #[test]
    fn empty_filter_accepts_anything() {
        let listing = berlin_listing();
        assert!(matches(&listing, &UserFilter::default()));
    }

    #[test]
    fn city_substring_matches_either_direction() {
        let listing = berlin_listing();
        let mut filter = UserFilter::default();
        filter.city = Some("berlin".to_string());
        assert!(matches(&listing, &filter));

        filter.city = Some("Berlin-Mitte".to_string());
        assert!(matches(&listing, &filter) == listing.city.to_lowercase().contains("berlin-mitte")
            || "berlin-mitte".contains(&listing.city.to_lowercase()));
    }

    #[test]
    fn city_mismatch_rejects() {
        let listing = berlin_listing();
        let mut filter = UserFilter::default();
        filter.city = Some("Hamburg".to_string());
        assert!(!matches(&listing, &filter));
    }

    #[test]
    fn explicit_zero_min_bound_still_applies() {
        let listing = berlin_listing();
        let mut filter = UserFilter::default();
        filter.price_min = Some(Decimal::ZERO);
        assert!(matches(&listing, &filter));
    }

    #[test]
    fn explicit_zero_max_bound_rejects_nonzero_price() {
        let listing = berlin_listing();
        let mut filter = UserFilter::default();
        filter.price_max = Some(Decimal::ZERO);
        assert!(!matches(&listing, &filter));
    }

    #[test]
    fn missing_listing_value_bypasses_bound_regardless_of_filter() {
        let mut listing = berlin_listing();
        listing.rooms = Decimal::ZERO;
        let mut filter = UserFilter::default();
        filter.rooms_min = Some(Decimal::from(2));
        assert!(matches(&listing, &filter));
    }

    #[test]
    fn price_above_max_rejects() {
        let listing = berlin_listing();
        let mut filter = UserFilter::default();
        filter.price_max = Some(listing.price - Decimal::ONE);
        assert!(!matches(&listing, &filter));
    }

    #[test]
    fn price_within_bounds_accepts() {
        let listing = berlin_listing();
        let mut filter = UserFilter::default();
        filter.price_min = Some(listing.price - Decimal::ONE);
        filter.price_max = Some(listing.price + Decimal::ONE);
        assert!(matches(&listing, &filter));
    }

    #[test]
    fn keywords_never_reject() {
        let listing = berlin_listing();
        let mut filter = UserFilter::default();
        filter.keywords = vec!["zzz-not-present-anywhere".to_string()];
        assert!(matches(&listing, &filter));
        assert_eq!(keyword_score(&listing, &filter), 0);
    }
}
