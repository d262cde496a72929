//! The Persistence Gateway (§3 ownership, §6): an abstract contract any
//! durable document or relational store can satisfy. [`InMemoryGateway`] is
//! the reference implementation used by tests, examples and the demo
//! feature flag; a production deployment supplies its own implementation
//! (Mongo, Postgres, ...) behind the same trait.

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

use aptwatch_types::{IngestError, Listing, Query};

use crate::entities::{NotificationRecord, Subscription, User, UserFilter};

/// Abstract durable store for users, filters, listings, subscriptions and
/// notification records (§6 persistence boundary).
///
/// Every method is async so implementations can reach a remote database;
/// `InMemoryGateway` simply never awaits.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Look up a user by id.
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, IngestError>;

    /// Create a new user record. Returns an error if one already exists.
    async fn create_user(&self, user: User) -> Result<(), IngestError>;

    /// Update a user's preferred language.
    async fn update_user_language(
        &self,
        user_id: &str,
        language: crate::entities::Language,
    ) -> Result<(), IngestError>;

    /// Fetch the user's current subscription, if any.
    async fn get_active_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<Subscription>, IngestError>;

    /// Upsert a subscription record.
    async fn save_subscription(&self, subscription: Subscription) -> Result<(), IngestError>;

    /// Fetch the user's stored filter, if any.
    async fn get_user_filter(&self, user_id: &str) -> Result<Option<UserFilter>, IngestError>;

    /// Upsert the user's filter (at most one per user).
    async fn save_user_filter(&self, user_id: &str, filter: UserFilter) -> Result<(), IngestError>;

    /// Upsert a listing keyed by `(source, external_id)`. An existing row is
    /// updated in place (§7 persistence-conflict handling); `last_seen` is
    /// always bumped to the incoming value.
    async fn save_listing(&self, listing: Listing) -> Result<(), IngestError>;

    /// Search persisted listings matching `query`, most-recent first,
    /// paginated by `limit`/`skip`.
    async fn find_listings(
        &self,
        query: &Query,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<Listing>, IngestError>;

    /// Every surrogate id currently known to the store, used to rebuild the
    /// in-memory [`crate::dedup::DedupStore`] at startup.
    async fn known_surrogate_ids(&self) -> Result<BTreeSet<String>, IngestError>;

    /// Append a notification audit row.
    async fn save_notification(&self, record: NotificationRecord) -> Result<(), IngestError>;

    /// Whether a `(user_id, listing_surrogate_id)` notification record
    /// already exists (the at-most-once delivery check, §4.5).
    async fn has_notification(
        &self,
        user_id: &str,
        listing_surrogate_id: &str,
    ) -> Result<bool, IngestError>;

    /// Every user with a currently active subscription.
    async fn users_with_active_subscriptions(&self) -> Result<Vec<User>, IngestError>;

    /// Purge listings whose `last_seen` is older than `retention`, returning
    /// the number of rows removed (the janitor sweep, §3 lifecycle).
    async fn purge_listings_older_than(
        &self,
        retention: ChronoDuration,
    ) -> Result<usize, IngestError>;
}

#[derive(Default)]
struct Store {
    users: std::collections::HashMap<String, User>,
    subscriptions: std::collections::HashMap<String, Subscription>,
    filters: std::collections::HashMap<String, UserFilter>,
    listings: std::collections::HashMap<(String, String), Listing>,
    notifications: BTreeSet<(String, String)>,
    notification_log: Vec<NotificationRecord>,
}

/// In-process reference implementation of [`PersistenceGateway`], backed by
/// a single `RwLock`-guarded map set. Suitable for tests, examples and
/// single-instance demo deployments (§5 notes no distributed coordination
/// is assumed).
#[derive(Default)]
pub struct InMemoryGateway {
    store: RwLock<Store>,
}

impl InMemoryGateway {
    /// Construct an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn query_matches_stored(listing: &Listing, query: &Query) -> bool {
    if !query.city.is_empty()
        && !listing
            .city
            .to_lowercase()
            .contains(&query.city.to_lowercase())
    {
        return false;
    }
    if listing.price > rust_decimal::Decimal::ZERO {
        if let Some(min) = query.price_min {
            if listing.price < min {
                return false;
            }
        }
        if let Some(max) = query.price_max {
            if listing.price > max {
                return false;
            }
        }
    }
    true
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, IngestError> {
        Ok(self.read().users.get(user_id).cloned())
    }

    async fn create_user(&self, user: User) -> Result<(), IngestError> {
        let mut store = self.write();
        if store.users.contains_key(&user.id) {
            return Err(IngestError::PersistenceConflict {
                entity: "user".to_string(),
                msg: format!("user {} already exists", user.id),
            });
        }
        store.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn update_user_language(
        &self,
        user_id: &str,
        language: crate::entities::Language,
    ) -> Result<(), IngestError> {
        let mut store = self.write();
        let user = store
            .users
            .get_mut(user_id)
            .ok_or_else(|| IngestError::not_found(format!("user {user_id}")))?;
        user.language = language;
        Ok(())
    }

    async fn get_active_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<Subscription>, IngestError> {
        Ok(self.read().subscriptions.get(user_id).cloned())
    }

    async fn save_subscription(&self, subscription: Subscription) -> Result<(), IngestError> {
        self.write()
            .subscriptions
            .insert(subscription.user_id.clone(), subscription);
        Ok(())
    }

    async fn get_user_filter(&self, user_id: &str) -> Result<Option<UserFilter>, IngestError> {
        Ok(self.read().filters.get(user_id).cloned())
    }

    async fn save_user_filter(&self, user_id: &str, filter: UserFilter) -> Result<(), IngestError> {
        self.write().filters.insert(user_id.to_string(), filter);
        Ok(())
    }

    async fn save_listing(&self, listing: Listing) -> Result<(), IngestError> {
        let key = (listing.source.as_str().to_string(), listing.external_id.clone());
        self.write().listings.insert(key, listing);
        Ok(())
    }

    async fn find_listings(
        &self,
        query: &Query,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<Listing>, IngestError> {
        let store = self.read();
        let mut matches: Vec<Listing> = store
            .listings
            .values()
            .filter(|l| query_matches_stored(l, query))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(matches.into_iter().skip(skip).take(limit).collect())
    }

    async fn known_surrogate_ids(&self) -> Result<BTreeSet<String>, IngestError> {
        Ok(self
            .read()
            .listings
            .values()
            .map(|l| l.surrogate_id.clone())
            .collect())
    }

    async fn save_notification(&self, record: NotificationRecord) -> Result<(), IngestError> {
        let mut store = self.write();
        let key = (record.user_id.clone(), record.listing_surrogate_id.clone());
        if !store.notifications.insert(key) {
            return Err(IngestError::PersistenceConflict {
                entity: "notification".to_string(),
                msg: format!(
                    "notification for user {} / listing {} already recorded",
                    record.user_id, record.listing_surrogate_id
                ),
            });
        }
        store.notification_log.push(record);
        Ok(())
    }

    async fn has_notification(
        &self,
        user_id: &str,
        listing_surrogate_id: &str,
    ) -> Result<bool, IngestError> {
        Ok(self
            .read()
            .notifications
            .contains(&(user_id.to_string(), listing_surrogate_id.to_string())))
    }

    async fn users_with_active_subscriptions(&self) -> Result<Vec<User>, IngestError> {
        let store = self.read();
        let now = Utc::now();
        Ok(store
            .subscriptions
            .values()
            .filter(|s| s.is_active(now))
            .filter_map(|s| store.users.get(&s.user_id).cloned())
            .collect())
    }

    async fn purge_listings_older_than(
        &self,
        retention: ChronoDuration,
    ) -> Result<usize, IngestError> {
        let cutoff: DateTime<Utc> = Utc::now() - retention;
        let mut store = self.write();
        let before = store.listings.len();
        store.listings.retain(|_, l| l.last_seen >= cutoff);
        Ok(before - store.listings.len())
    }
}
