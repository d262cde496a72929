//! aptwatch orchestrates continuous monitoring of German apartment-listing
//! sources on behalf of subscribed users.
//!
//! Overview
//! - Runs an adaptive enqueuer/worker-pool ingestion loop (§4.2-§4.3) that
//!   fetches every configured [`aptwatch_core::ProviderAdapter`] per active
//!   city, normalizes results through `aptwatch-core`, and deduplicates
//!   against a hot in-memory set backed by the [`PersistenceGateway`].
//! - Matches freshly persisted listings against each user's stored filter
//!   (§4.4) and fans matching listings out through a [`MessagingSender`]
//!   collaborator, honoring a per-user throttle and per-cycle cap with
//!   at-most-once delivery (§4.5).
//! - Adapts its own tick and cooldown windows to a configured quiet-hours
//!   period, and exposes a force-check entry point that bypasses every
//!   adapter's cooldown gate for an on-demand refresh.
//!
//! Key behaviors and trade-offs
//! - Dedup store: an in-process `HashSet` mirrors persisted surrogate ids so
//!   a worker can reject an already-seen listing without a database round
//!   trip; a cold start only costs a redundant upsert, never a missed
//!   duplicate.
//! - Filter matching: city is a case-insensitive substring match tried in
//!   both directions; numeric bounds only constrain a match when set *and*
//!   strictly positive; keywords are scored but never reject (§4.4).
//! - Immowelt's three-tier URL cascade (full filter → relaxed → location
//!   only) trades result precision for a non-empty result when a strict
//!   filter has nothing to show.
//! - Persistence and messaging are both abstracted behind traits
//!   ([`PersistenceGateway`], [`MessagingSender`]) so the engine never
//!   assumes a specific database or delivery channel; [`InMemoryGateway`]
//!   and [`NullMessagingSender`] are reference implementations for tests
//!   and demos.
#![warn(missing_docs)]

/// Persisted entity model: users, subscriptions, filters, notification log.
pub mod entities;
/// The hot in-memory dedup set mirroring the persistence layer.
pub mod dedup;
/// The Persistence Gateway trait and its in-memory reference implementation.
pub mod gateway;
/// The Filter Matcher (§4.4).
pub mod matcher;
/// The outbound messaging collaborator boundary.
pub mod messaging;
/// The Notification Dispatcher (§4.5).
pub mod dispatcher;
/// The adaptive Scheduler / ingestion loop (§4.2-§4.3).
pub mod scheduler;
/// Environment-driven configuration loading (§6).
pub mod settings;

pub use aptwatch_core::{AdapterResult, ProviderAdapter, SharedAdapter};
pub use aptwatch_providers::{
    build_immoscout24, build_immowelt, build_kleinanzeigen, ActorClient, ImmoScout24Adapter,
    ImmoweltAdapter, KleinanzeigenAdapter,
};
pub use aptwatch_types::config::{
    AppConfig, CooldownConfig, DefaultFilterSkeleton, EnrichmentConfig, FeatureFlags,
    NotificationConfig, ProviderConfig, QuietHours, RetryConfig, RunMode, SchedulerConfig,
};
pub use aptwatch_types::{IngestError, Listing, Query, RawValue, SourceKey};

pub use dedup::DedupStore;
pub use dispatcher::{DispatchOutcome, NotificationDispatcher};
pub use entities::{
    Language, NotificationRecord, Subscription, SubscriptionStatus, User, UserFilter,
};
pub use gateway::{InMemoryGateway, PersistenceGateway};
pub use messaging::{MessagingSender, NullMessagingSender};
pub use scheduler::{Scheduler, SchedulerState};
pub use settings::{load_app_config, load_provider_configs, ProviderConfigs};
