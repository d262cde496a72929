//! Cooldown-gating middleware (§4.1): refuses to call the inner adapter
//! again until its per-source cooldown has elapsed.
//!
//! The upstream engine keeps this as a middleware layer (rather than folded
//! into each adapter) so the same policy — and the same quiet-hours scaling —
//! applies uniformly across every provider, and so tests can exercise the
//! gate in isolation from any real adapter.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::json;

use aptwatch_core::{
    AdapterResult, Middleware, MiddlewarePosition, ProviderAdapter, SharedAdapter,
    ValidationContext,
};
use aptwatch_types::config::CooldownConfig;
use aptwatch_types::listing::Query;
use aptwatch_types::source::SourceKey;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// An adapter wrapper that refuses to re-run its inner adapter before its
/// cooldown elapses, unless the query carries `bypass_cooldown`.
pub struct CooldownGatedAdapter {
    inner: SharedAdapter,
    config: CooldownConfig,
    last_run_ms: AtomicI64,
}

impl CooldownGatedAdapter {
    /// Wrap `inner` with `config`'s cooldown policy. The gate starts open:
    /// the first call always runs.
    #[must_use]
    pub fn new(inner: SharedAdapter, config: CooldownConfig) -> Self {
        Self {
            inner,
            config,
            last_run_ms: AtomicI64::new(i64::MIN),
        }
    }

    fn remaining_ms(&self, is_quiet: bool) -> Option<u64> {
        let last = self.last_run_ms.load(Ordering::Acquire);
        if last == i64::MIN {
            return None;
        }
        let elapsed = now_ms().saturating_sub(last);
        let cooldown_ms = self.config.effective(is_quiet).as_millis() as i64;
        let remaining = cooldown_ms - elapsed;
        if remaining > 0 {
            Some(remaining as u64)
        } else {
            None
        }
    }
}

#[async_trait]
#[aptwatch_macros::delegate_adapter_identity(inner)]
impl ProviderAdapter for CooldownGatedAdapter {
    async fn fetch(&self, query: &Query) -> AdapterResult {
        if !query.bypass_cooldown
            && let Some(remaining_ms) = self.remaining_ms(query.is_quiet_hours)
        {
            return AdapterResult::SkippedCooldown { remaining_ms };
        }
        let result = self.inner.fetch(query).await;
        self.last_run_ms.store(now_ms(), Ordering::Release);
        result
    }
}

/// Builder-facing middleware that installs a [`CooldownGatedAdapter`].
pub struct CooldownGate {
    config: CooldownConfig,
}

impl CooldownGate {
    /// Create the gate with the given cooldown policy.
    #[must_use]
    pub const fn new(config: CooldownConfig) -> Self {
        Self { config }
    }
}

impl Middleware for CooldownGate {
    fn apply(self: Box<Self>, inner: Arc<dyn ProviderAdapter>) -> Arc<dyn ProviderAdapter> {
        Arc::new(CooldownGatedAdapter::new(inner, self.config))
    }

    fn name(&self) -> &'static str {
        "CooldownGate"
    }

    fn config_json(&self) -> serde_json::Value {
        json!({
            "base_cooldown_secs": self.config.base_cooldown.as_secs(),
            "quiet_scaling": self.config.quiet_scaling,
        })
    }
}

/// Position requirement helper, kept for builders that want to pin
/// [`CooldownGate`] relative to other layers without importing
/// [`MiddlewarePosition`] directly.
#[must_use]
pub const fn preferred_position() -> MiddlewarePosition {
    MiddlewarePosition::Any
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptwatch_mock::MockProviderAdapter;
    use aptwatch_types::listing::Query;
    use std::time::Duration as StdDuration;

    fn tiny_config() -> CooldownConfig {
        CooldownConfig {
            base_cooldown: StdDuration::from_millis(50),
            quiet_scaling: 4.0,
        }
    }

    #[tokio::test]
    async fn first_call_always_runs() {
        let mock = Arc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, vec![]));
        let gated = CooldownGatedAdapter::new(mock, tiny_config());
        let query = Query::for_city("Berlin");
        let result = gated.fetch(&query).await;
        assert!(matches!(result, AdapterResult::Items(_)));
    }

    #[tokio::test]
    async fn second_call_within_window_is_skipped() {
        let mock = Arc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, vec![]));
        let gated = CooldownGatedAdapter::new(mock, tiny_config());
        let query = Query::for_city("Berlin");
        let _ = gated.fetch(&query).await;
        let second = gated.fetch(&query).await;
        assert!(matches!(second, AdapterResult::SkippedCooldown { .. }));
    }

    #[tokio::test]
    async fn bypass_cooldown_always_runs() {
        let mock = Arc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, vec![]));
        let gated = CooldownGatedAdapter::new(mock, tiny_config());
        let mut query = Query::for_city("Berlin");
        let _ = gated.fetch(&query).await;
        query.bypass_cooldown = true;
        let second = gated.fetch(&query).await;
        assert!(matches!(second, AdapterResult::Items(_)));
    }

    #[tokio::test]
    async fn cooldown_elapses_after_wait() {
        let mock = Arc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, vec![]));
        let gated = CooldownGatedAdapter::new(mock, tiny_config());
        let query = Query::for_city("Berlin");
        let _ = gated.fetch(&query).await;
        tokio::time::sleep(StdDuration::from_millis(80)).await;
        let second = gated.fetch(&query).await;
        assert!(matches!(second, AdapterResult::Items(_)));
    }

    #[tokio::test]
    async fn quiet_hours_scale_the_window() {
        let mock = Arc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, vec![]));
        let gated = CooldownGatedAdapter::new(mock, tiny_config());
        let mut query = Query::for_city("Berlin");
        query.is_quiet_hours = true;
        let _ = gated.fetch(&query).await;
        // 50ms * 4.0 quiet scaling: 80ms isn't enough to clear it.
        tokio::time::sleep(StdDuration::from_millis(80)).await;
        let second = gated.fetch(&query).await;
        assert!(matches!(second, AdapterResult::SkippedCooldown { .. }));
    }
}
