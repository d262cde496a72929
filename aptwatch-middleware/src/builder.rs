//! Builder for composing a [`ProviderAdapter`] with middleware layers.
//!
//! # Middleware Ordering Convention
//!
//! Middleware layers form an "onion" around the raw adapter:
//!
//! ```text
//! Scheduler call
//!     ↓
//! Outermost (EnrichmentCache - serves cached description/images first)
//!     ↓
//! SoftFailureGuard - skips a recently-quarantined adapter
//!     ↓
//! CooldownGate - enforces the per-source cooldown window
//!     ↓
//! Raw Adapter - makes the actual actor call
//! ```
//!
//! ## Storage vs Application Order
//!
//! The `layers` vector stores middleware in **outermost-first** order for
//! intuitive builder semantics (last added via a default policy call ends up
//! outermost), but they are **applied in reverse** during `build()` to
//! construct the proper nesting. This mirrors
//! [`MiddlewareStack`](aptwatch_types::MiddlewareStack), where `layers[0]` is
//! the outermost layer.

use std::sync::Arc;
use std::time::Duration;

use aptwatch_core::middleware::{MiddlewareDescriptor, ValidationContext};
use aptwatch_core::{IngestError, ProviderAdapter};
use aptwatch_types::{MiddlewareLayer, MiddlewareStack};
use serde_json::json;

use crate::cooldown::CooldownGate;
use crate::enrichment_cache::EnrichmentCache;
use crate::soft_failure::SoftFailureGuard;

/// Builder for composing a raw provider adapter with the standard middleware
/// layers. See [module-level documentation](self) for the ordering policy.
pub struct AdapterBuilder {
    raw: Arc<dyn ProviderAdapter>,
    /// Middleware layers in outermost-first order; applied in reverse by
    /// [`build`](Self::build) to construct the proper nesting.
    layers: Vec<MiddlewareDescriptor>,
}

impl AdapterBuilder {
    /// Start building from a raw, unwrapped adapter.
    #[must_use]
    pub fn new(raw: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            raw,
            layers: Vec::new(),
        }
    }

    /// Reorder layers to satisfy the fixed policy: `EnrichmentCache`
    /// (outermost) -> `SoftFailureGuard` -> `CooldownGate` -> others.
    fn enforce_ordering(&mut self) {
        self.layers.sort_by_key(|d| match d.name() {
            "EnrichmentCache" => 0,
            "SoftFailureGuard" => 1,
            "CooldownGate" => 2,
            _ => 3,
        });
    }

    /// Add or replace the cooldown gate.
    #[must_use]
    pub fn with_cooldown(mut self, config: aptwatch_types::config::CooldownConfig) -> Self {
        self.layers.retain(|d| d.name() != "CooldownGate");
        self.layers
            .push(MiddlewareDescriptor::new(CooldownGate::new(config)));
        self.enforce_ordering();
        self
    }

    /// Remove the cooldown gate if present.
    #[must_use]
    pub fn without_cooldown(mut self) -> Self {
        self.layers.retain(|d| d.name() != "CooldownGate");
        self
    }

    /// Add or replace the soft-failure quarantine guard.
    #[must_use]
    pub fn with_soft_failure_guard(mut self, quarantine: Duration) -> Self {
        self.layers.retain(|d| d.name() != "SoftFailureGuard");
        self.layers
            .push(MiddlewareDescriptor::new(SoftFailureGuard::new(quarantine)));
        self.enforce_ordering();
        self
    }

    /// Remove the soft-failure guard if present.
    #[must_use]
    pub fn without_soft_failure_guard(mut self) -> Self {
        self.layers.retain(|d| d.name() != "SoftFailureGuard");
        self
    }

    /// Add or replace the enrichment cache.
    #[must_use]
    pub fn with_enrichment_cache(
        mut self,
        client: reqwest::Client,
        timeout: Duration,
        ttl: Duration,
        max_capacity: u64,
    ) -> Self {
        self.layers.retain(|d| d.name() != "EnrichmentCache");
        self.layers.insert(
            0,
            MiddlewareDescriptor::new(EnrichmentCache::new(client, timeout, ttl, max_capacity)),
        );
        self.enforce_ordering();
        self
    }

    /// Remove the enrichment cache if present.
    #[must_use]
    pub fn without_enrichment_cache(mut self) -> Self {
        self.layers.retain(|d| d.name() != "EnrichmentCache");
        self
    }

    /// Export the current middleware stack for inspection/storage. The raw
    /// adapter is appended as the innermost "layer" for observability.
    #[must_use]
    pub fn to_stack(&self) -> MiddlewareStack {
        let mut stack = MiddlewareStack::new();
        for desc in &self.layers {
            stack.push_inner(MiddlewareLayer::new(
                desc.name(),
                desc.middleware().config_json(),
            ));
        }
        stack.push_inner(MiddlewareLayer::new(
            "RawAdapter",
            json!({ "source": self.raw.source().as_str() }),
        ));
        stack
    }

    /// Validate the middleware stack without building it.
    ///
    /// # Errors
    /// Returns an error if any layer's [`validate`](aptwatch_core::Middleware::validate) fails.
    pub fn validate(&self) -> Result<(), IngestError> {
        for (idx, desc) in self.layers.iter().enumerate().rev() {
            let ctx = ValidationContext::new(&self.layers, idx);
            desc.middleware().validate(&ctx)?;
        }
        Ok(())
    }

    /// Build the wrapped adapter according to the captured stack.
    ///
    /// # Errors
    /// Returns an error if [`validate`](Self::validate) fails.
    pub fn build(self) -> Result<Arc<dyn ProviderAdapter>, IngestError> {
        self.validate()?;

        let mut acc: Arc<dyn ProviderAdapter> = Arc::clone(&self.raw);
        for desc in self.layers.into_iter().rev() {
            acc = desc.into_middleware().apply(acc);
        }
        Ok(acc)
    }

    /// Add an arbitrary middleware layer at the outermost position.
    #[must_use]
    pub fn layer<M: aptwatch_core::Middleware + 'static>(mut self, layer: M) -> Self {
        self.layers.insert(0, MiddlewareDescriptor::new(layer));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptwatch_mock::MockProviderAdapter;
    use aptwatch_types::listing::Query;
    use aptwatch_types::source::SourceKey;

    #[test]
    fn default_policy_orders_cache_outermost_then_guard_then_cooldown() {
        let raw = Arc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, vec![]));
        let builder = AdapterBuilder::new(raw)
            .with_cooldown(aptwatch_types::config::CooldownConfig::default())
            .with_soft_failure_guard(Duration::from_secs(60))
            .with_enrichment_cache(
                reqwest::Client::new(),
                Duration::from_secs(5),
                Duration::from_secs(60),
                100,
            );

        let names: Vec<&str> = builder.layers.iter().map(MiddlewareDescriptor::name).collect();
        assert_eq!(names, vec!["EnrichmentCache", "SoftFailureGuard", "CooldownGate"]);
    }

    #[test]
    fn without_methods_remove_layers() {
        let raw = Arc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, vec![]));
        let builder = AdapterBuilder::new(raw)
            .with_cooldown(aptwatch_types::config::CooldownConfig::default())
            .without_cooldown();
        assert!(builder.layers.is_empty());
    }

    #[tokio::test]
    async fn build_produces_a_working_adapter() {
        let raw = Arc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, vec![]));
        let wrapped = AdapterBuilder::new(raw)
            .with_cooldown(aptwatch_types::config::CooldownConfig::default())
            .build()
            .expect("valid stack");

        let result = wrapped.fetch(&Query::for_city("Berlin")).await;
        assert!(matches!(result, aptwatch_core::AdapterResult::Items(_)));
    }

    #[test]
    fn to_stack_round_trips_layer_names() {
        let raw = Arc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, vec![]));
        let builder =
            AdapterBuilder::new(raw).with_cooldown(aptwatch_types::config::CooldownConfig::default());
        let stack = builder.to_stack();
        assert_eq!(stack.layers.len(), 2);
        assert_eq!(stack.layers[0].name, "CooldownGate");
        assert_eq!(stack.layers[1].name, "RawAdapter");
    }
}
