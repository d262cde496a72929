//! Soft-failure quarantine middleware: after the inner adapter reports a
//! quota/payment failure or a hard rejection, stop calling it for a short
//! window instead of hammering an upstream actor that has already said no.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::json;

use aptwatch_core::{
    AdapterResult, Middleware, ProviderAdapter, SharedAdapter, ValidationContext,
};
use aptwatch_types::IngestError;
use aptwatch_types::listing::Query;
use aptwatch_types::source::SourceKey;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn is_quarantine_trigger(outcome: &AdapterResult) -> bool {
    matches!(outcome, AdapterResult::RemoteRejected)
}

/// An adapter wrapper that quarantines its inner adapter for `quarantine`
/// after it reports a terminal-looking failure, returning
/// [`AdapterResult::SkippedCooldown`] with the remaining quarantine time
/// instead of calling through while quarantined.
pub struct SoftFailureGuardedAdapter {
    inner: SharedAdapter,
    quarantine: Duration,
    quarantined_until_ms: AtomicI64,
}

impl SoftFailureGuardedAdapter {
    /// Wrap `inner`, quarantining it for `quarantine` after a terminal
    /// failure. Starts un-quarantined.
    #[must_use]
    pub fn new(inner: SharedAdapter, quarantine: Duration) -> Self {
        Self {
            inner,
            quarantine,
            quarantined_until_ms: AtomicI64::new(i64::MIN),
        }
    }

    fn remaining_quarantine_ms(&self) -> Option<u64> {
        let until = self.quarantined_until_ms.load(Ordering::Acquire);
        if until == i64::MIN {
            return None;
        }
        let remaining = until - now_ms();
        if remaining > 0 {
            Some(remaining as u64)
        } else {
            None
        }
    }
}

#[async_trait]
#[aptwatch_macros::delegate_adapter_identity(inner)]
impl ProviderAdapter for SoftFailureGuardedAdapter {
    async fn fetch(&self, query: &Query) -> AdapterResult {
        if !query.bypass_cooldown
            && let Some(remaining_ms) = self.remaining_quarantine_ms()
        {
            return AdapterResult::SkippedCooldown { remaining_ms };
        }

        let result = self.inner.fetch(query).await;
        if is_quarantine_trigger(&result) {
            let until = now_ms() + self.quarantine.as_millis() as i64;
            self.quarantined_until_ms.store(until, Ordering::Release);
        }
        result
    }
}

/// Builder-facing middleware that installs a [`SoftFailureGuardedAdapter`].
pub struct SoftFailureGuard {
    quarantine: Duration,
}

impl SoftFailureGuard {
    /// Create the guard with the given quarantine duration.
    #[must_use]
    pub const fn new(quarantine: Duration) -> Self {
        Self { quarantine }
    }
}

impl Middleware for SoftFailureGuard {
    fn apply(self: Box<Self>, inner: Arc<dyn ProviderAdapter>) -> Arc<dyn ProviderAdapter> {
        Arc::new(SoftFailureGuardedAdapter::new(inner, self.quarantine))
    }

    fn name(&self) -> &'static str {
        "SoftFailureGuard"
    }

    fn config_json(&self) -> serde_json::Value {
        json!({ "quarantine_secs": self.quarantine.as_secs() })
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), IngestError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptwatch_mock::{DynamicMockAdapter, MockBehavior};
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn quota_failure_triggers_quarantine() {
        // `error_to_result` folds a quota/payment rejection into
        // `RemoteRejected`, never `TransportError` — exercise the shape
        // quarantine actually sees.
        let (mock, controller) = DynamicMockAdapter::new_with_controller(SourceKey::IMMOSCOUT24);
        controller
            .set_behavior("Berlin", MockBehavior::Return(AdapterResult::RemoteRejected))
            .await;
        let guarded = SoftFailureGuardedAdapter::new(mock, StdDuration::from_millis(100));
        let query = Query::for_city("Berlin");

        let first = guarded.fetch(&query).await;
        assert!(matches!(first, AdapterResult::RemoteRejected));

        let second = guarded.fetch(&query).await;
        assert!(matches!(second, AdapterResult::SkippedCooldown { .. }));
    }

    #[tokio::test]
    async fn transport_error_does_not_trigger_quarantine() {
        let (mock, controller) = DynamicMockAdapter::new_with_controller(SourceKey::IMMOSCOUT24);
        controller
            .set_behavior(
                "Berlin",
                MockBehavior::Return(AdapterResult::TransportError(IngestError::transport(
                    "immobilienscout24",
                    "connection reset",
                ))),
            )
            .await;
        let guarded = SoftFailureGuardedAdapter::new(mock, StdDuration::from_secs(60));
        let query = Query::for_city("Berlin");

        let _ = guarded.fetch(&query).await;
        let second = guarded.fetch(&query).await;
        assert!(matches!(second, AdapterResult::TransportError(_)));
    }

    #[tokio::test]
    async fn quarantine_expires() {
        let (mock, controller) = DynamicMockAdapter::new_with_controller(SourceKey::IMMOSCOUT24);
        controller
            .set_behavior("Berlin", MockBehavior::Return(AdapterResult::RemoteRejected))
            .await;
        let guarded = SoftFailureGuardedAdapter::new(mock, StdDuration::from_millis(30));
        let query = Query::for_city("Berlin");

        let _ = guarded.fetch(&query).await;
        controller
            .set_behavior("Berlin", MockBehavior::Return(AdapterResult::Items(vec![])))
            .await;
        tokio::time::sleep(StdDuration::from_millis(60)).await;
        let third = guarded.fetch(&query).await;
        assert!(matches!(third, AdapterResult::Items(_)));
    }

    #[tokio::test]
    async fn bypass_cooldown_ignores_quarantine() {
        let (mock, controller) = DynamicMockAdapter::new_with_controller(SourceKey::IMMOSCOUT24);
        controller
            .set_behavior("Berlin", MockBehavior::Return(AdapterResult::RemoteRejected))
            .await;
        let guarded = SoftFailureGuardedAdapter::new(mock, StdDuration::from_secs(60));
        let mut query = Query::for_city("Berlin");

        let _ = guarded.fetch(&query).await;
        query.bypass_cooldown = true;
        let second = guarded.fetch(&query).await;
        assert!(matches!(second, AdapterResult::RemoteRejected));
    }
}
