//! The Dedup Store (§4.3): a hot in-memory set of surrogate ids mirroring
//! what the [`crate::gateway::PersistenceGateway`] already has on disk, so a
//! worker can reject an already-seen listing without an extra round trip.

use std::collections::HashSet;
use std::sync::RwLock;

/// Concurrency-safe set of surrogate ids seen this process lifetime.
///
/// Seeded from [`crate::gateway::PersistenceGateway::known_surrogate_ids`] at
/// startup; a miss here still falls through to a `save_listing` upsert, so a
/// false negative (cold cache, restart) only costs a redundant write, never
/// a correctness violation.
#[derive(Default)]
pub struct DedupStore {
    seen: RwLock<HashSet<String>>,
}

impl DedupStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from a known set, e.g. loaded from persistence at
    /// startup.
    #[must_use]
    pub fn from_known(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            seen: RwLock::new(ids.into_iter().collect()),
        }
    }

    /// Whether `surrogate_id` has already been recorded.
    #[must_use]
    pub fn contains(&self, surrogate_id: &str) -> bool {
        self.seen
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(surrogate_id)
    }

    /// Record `surrogate_id` as seen. Returns `true` if this is the first
    /// time it has been recorded (i.e. the listing is new).
    pub fn record(&self, surrogate_id: &str) -> bool {
        self.seen
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(surrogate_id.to_string())
    }

    /// Current size of the set, mainly for diagnostics and tests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the current set of surrogate ids, mainly for tests.
    #[must_use]
    pub fn snapshot(&self) -> HashSet<String> {
        self.seen
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_reports_first_sighting_only() {
        let store = DedupStore::new();
        assert!(store.record("a"));
        assert!(!store.record("a"));
        assert!(store.contains("a"));
    }

    #[test]
    fn from_known_seeds_existing_ids() {
        let store = DedupStore::from_known(["x".to_string(), "y".to_string()]);
        assert!(store.contains("x"));
        assert!(!store.record("x"));
        assert!(store.record("z"));
        assert_eq!(store.len(), 3);
    }
}
