//! Persisted entities the engine reads and writes through the
//! [`crate::gateway::PersistenceGateway`] (§3): users, subscriptions,
//! per-user filters, and the notification audit trail.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed set of UI language tags a user may prefer.
///
/// The chat-bot conversation layer and localization catalog are out of
/// scope here; this tag is all the core needs to hand the messaging
/// collaborator so it can pick a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Language {
    /// German.
    De,
    /// English.
    En,
    /// Russian.
    Ru,
    /// Ukrainian.
    Uk,
}

impl Default for Language {
    fn default() -> Self {
        Self::De
    }
}

/// A registered user of the listing monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier stable across the external messaging collaborator
    /// and this engine (e.g. a chat-platform user id).
    pub id: String,
    /// Preferred UI language.
    pub language: Language,
}

/// Subscription lifecycle status (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SubscriptionStatus {
    /// Subscription is active and within its validity window.
    Active,
    /// Subscription has been explicitly cancelled.
    Cancelled,
    /// Subscription lapsed (payment failure, non-renewal, etc.).
    Expired,
}

/// A user's subscription record.
///
/// Active ⇔ `status == Active ∧ now < expires_at`; both conditions are
/// checked together by [`Subscription::is_active`] rather than trusting
/// `status` alone, since an expiry sweep may not have run yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// The subscribing user's id.
    pub user_id: String,
    /// Current lifecycle status.
    pub status: SubscriptionStatus,
    /// When the subscription was created.
    pub created_at: DateTime<Utc>,
    /// When the subscription lapses.
    pub expires_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether this subscription currently grants ingestion-cycle
    /// membership: status is `Active` and `now` has not yet reached
    /// `expires_at`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, SubscriptionStatus::Active) && now < self.expires_at
    }
}

/// A user's stored search criteria (§3). At most one active filter exists
/// per user; all numeric bounds are `Option` so "unset" is never confused
/// with a zero bound (see the design notes on `price_min` truthiness bugs
/// in the source this was migrated from).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    /// City to search within; `None` falls back to the configured default.
    pub city: Option<String>,
    /// Minimum acceptable price, inclusive.
    pub price_min: Option<Decimal>,
    /// Maximum acceptable price, inclusive.
    pub price_max: Option<Decimal>,
    /// Minimum acceptable number of rooms, inclusive.
    pub rooms_min: Option<Decimal>,
    /// Maximum acceptable number of rooms, inclusive.
    pub rooms_max: Option<Decimal>,
    /// Minimum acceptable living area, inclusive.
    pub area_min: Option<Decimal>,
    /// Maximum acceptable living area, inclusive.
    pub area_max: Option<Decimal>,
    /// Soft keyword filter: presence increases relevance but absence never
    /// rejects a listing (§4.4, intentional per the design notes).
    pub keywords: Vec<String>,
}

/// Append-only audit row recording that `listing` was delivered to `user`
/// at `sent_at`. The `(user_id, listing_surrogate_id)` pair is unique and
/// is the mechanism guaranteeing at-most-once delivery (§4.5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Recipient user id.
    pub user_id: String,
    /// Surrogate id of the delivered listing.
    pub listing_surrogate_id: String,
    /// Delivery timestamp.
    pub sent_at: DateTime<Utc>,
}
