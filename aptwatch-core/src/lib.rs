//! aptwatch-core
//!
//! Core traits and utilities shared across the aptwatch ecosystem.
//!
//! - `adapter`: the `ProviderAdapter` trait, the seam every listing source implements.
//! - `normalize`: the Listing Normalizer — field-probe extraction, the meaningful-content
//!   gate, surrogate id derivation and best-effort HTML enrichment.
//! - `middleware`: the `Middleware` trait used to wrap adapters in cooldown gates,
//!   soft-failure guards and caching layers.
#![warn(missing_docs)]

/// The `ProviderAdapter` trait and its fetch-outcome type.
pub mod adapter;
/// Re-export of the unified error type.
pub mod error;
/// Adapter middleware trait and stack validation machinery.
pub mod middleware;
/// The Listing Normalizer.
pub mod normalize;

pub use adapter::{AdapterResult, ProviderAdapter, SharedAdapter};
pub use error::IngestError;
pub use middleware::{Middleware, MiddlewareDescriptor, MiddlewarePosition, ValidationContext};
pub use normalize::{enrich, normalize};
