use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use aptwatch_core::{AdapterResult, ProviderAdapter};
use aptwatch_types::listing::Query;
use aptwatch_types::source::SourceKey;

/// Instruction for how `fetch` should behave for a given city.
#[derive(Clone)]
pub enum MockBehavior {
    /// Return this `AdapterResult` immediately.
    Return(AdapterResult),
    /// Hang indefinitely (simulate a stalled actor run).
    Hang,
}

#[derive(Default)]
struct InternalState {
    rules: HashMap<String, MockBehavior>,
    default: Option<MockBehavior>,
    calls: Vec<Query>,
}

/// Controller handle used by tests to drive a [`DynamicMockAdapter`] from the
/// outside, changing its behavior mid-test without replacing the adapter.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Set the behavior `fetch` should exhibit for queries targeting `city`.
    pub async fn set_behavior(&self, city: impl Into<String>, behavior: MockBehavior) {
        self.state.lock().await.rules.insert(city.into(), behavior);
    }

    /// Set the behavior used for any city without a specific rule.
    pub async fn set_default_behavior(&self, behavior: MockBehavior) {
        self.state.lock().await.default = Some(behavior);
    }

    /// Clear every configured rule and the recorded call log.
    pub async fn reset(&self) {
        let mut guard = self.state.lock().await;
        guard.rules.clear();
        guard.default = None;
        guard.calls.clear();
    }

    /// Every query this adapter has received so far, in call order.
    pub async fn calls(&self) -> Vec<Query> {
        self.state.lock().await.calls.clone()
    }
}

/// A [`ProviderAdapter`] whose behavior is driven entirely by an external
/// [`DynamicMockController`], for exercising middleware stacks and scheduler
/// failure handling without any real network traffic.
pub struct DynamicMockAdapter {
    source: SourceKey,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockAdapter {
    /// Create a new dynamic mock adapter for `source` and its controller.
    #[must_use]
    pub fn new_with_controller(source: SourceKey) -> (Arc<dyn ProviderAdapter>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let adapter = Arc::new(Self { source, state });
        (adapter as Arc<dyn ProviderAdapter>, controller)
    }
}

#[async_trait]
impl ProviderAdapter for DynamicMockAdapter {
    fn source(&self) -> SourceKey {
        self.source
    }

    async fn fetch(&self, query: &Query) -> AdapterResult {
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.calls.push(query.clone());
            guard
                .rules
                .get(&query.city)
                .cloned()
                .or_else(|| guard.default.clone())
        };

        match behavior {
            Some(MockBehavior::Return(result)) => result,
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => AdapterResult::RemoteEmpty,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
