//! aptwatch-providers
//!
//! Concrete [`aptwatch_core::ProviderAdapter`] implementations for the three
//! upstream listing sources named in §6: `ImmobilienScout24`, Immowelt and
//! Kleinanzeigen. Every adapter here is a *raw* adapter — cost controls
//! (cooldown gating, soft-failure quarantine, enrichment caching) are
//! applied by wrapping it with [`aptwatch_middleware`], which the
//! constructors in [`builder`] do for you.
//!
//! All three providers speak the same actor-run protocol described in §4.1
//! steps 3-4 (synchronous or polled-async actor invocation, retried with
//! backoff); that shared conversation lives in [`actor`].
#![warn(missing_docs)]

/// The shared actor-run HTTP protocol (sync/async modes, retry policy).
pub mod actor;
/// Helpers shared by every provider for turning raw items into listings.
mod common;
/// Convenience constructors wiring raw adapters into the standard middleware stack.
pub mod builder;
/// `ImmobilienScout24` provider adapter.
pub mod immoscout;
/// Immowelt provider adapter, with its three-tier URL fallback cascade.
pub mod immowelt;
/// Kleinanzeigen provider adapter.
pub mod kleinanzeigen;

pub use actor::ActorClient;
pub use builder::{build_immoscout24, build_immowelt, build_kleinanzeigen};
pub use immoscout::ImmoScout24Adapter;
pub use immowelt::ImmoweltAdapter;
pub use kleinanzeigen::KleinanzeigenAdapter;
