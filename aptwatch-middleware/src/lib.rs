//! aptwatch-middleware
//!
//! Middleware wrappers for [`aptwatch_core::ProviderAdapter`]: cooldown
//! gating, soft-failure quarantine and enrichment caching, plus the
//! [`AdapterBuilder`] that composes them in the required order.
#![warn(missing_docs)]

mod builder;
mod cooldown;
mod enrichment_cache;
mod soft_failure;

pub use crate::builder::AdapterBuilder;
pub use crate::cooldown::{CooldownGate, CooldownGatedAdapter};
pub use crate::enrichment_cache::{EnrichmentCache, EnrichmentCachedAdapter};
pub use crate::soft_failure::{SoftFailureGuard, SoftFailureGuardedAdapter};
