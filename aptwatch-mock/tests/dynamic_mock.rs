use std::time::Duration;

use aptwatch_core::{AdapterResult, ProviderAdapter};
use aptwatch_mock::{DynamicMockAdapter, MockBehavior};
use aptwatch_types::listing::Query;
use aptwatch_types::source::SourceKey;

#[tokio::test]
async fn returns_configured_behavior_for_city() {
    let (mock, controller) = DynamicMockAdapter::new_with_controller(SourceKey::IMMOSCOUT24);
    controller
        .set_behavior("Berlin", MockBehavior::Return(AdapterResult::RemoteRejected))
        .await;

    let got = mock.fetch(&Query::for_city("Berlin")).await;
    assert!(matches!(got, AdapterResult::RemoteRejected));
}

#[tokio::test]
async fn unconfigured_city_falls_back_to_default_then_remote_empty() {
    let (mock, _controller) = DynamicMockAdapter::new_with_controller(SourceKey::IMMOWELT);
    let got = mock.fetch(&Query::for_city("Hamburg")).await;
    assert!(matches!(got, AdapterResult::RemoteEmpty));
}

#[tokio::test]
async fn default_behavior_applies_to_any_unrecognized_city() {
    let (mock, controller) = DynamicMockAdapter::new_with_controller(SourceKey::IMMOWELT);
    controller
        .set_default_behavior(MockBehavior::Return(AdapterResult::Items(vec![])))
        .await;

    let got = mock.fetch(&Query::for_city("Leipzig")).await;
    assert!(matches!(got, AdapterResult::Items(_)));
}

#[tokio::test]
async fn controller_records_every_call() {
    let (mock, controller) = DynamicMockAdapter::new_with_controller(SourceKey::KLEINANZEIGEN);
    let _ = mock.fetch(&Query::for_city("Berlin")).await;
    let _ = mock.fetch(&Query::for_city("Munich")).await;

    let calls = controller.calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].city, "Berlin");
    assert_eq!(calls[1].city, "Munich");
}

#[tokio::test]
async fn hang_behavior_never_resolves_within_a_short_timeout() {
    let (mock, controller) = DynamicMockAdapter::new_with_controller(SourceKey::IMMOSCOUT24);
    controller.set_behavior("Berlin", MockBehavior::Hang).await;

    let outcome = tokio::time::timeout(Duration::from_millis(50), mock.fetch(&Query::for_city("Berlin"))).await;
    assert!(outcome.is_err(), "hang behavior should not resolve before the timeout");
}

#[tokio::test]
async fn reset_clears_rules_and_call_log() {
    let (mock, controller) = DynamicMockAdapter::new_with_controller(SourceKey::IMMOSCOUT24);
    controller
        .set_behavior("Berlin", MockBehavior::Return(AdapterResult::RemoteRejected))
        .await;
    let _ = mock.fetch(&Query::for_city("Berlin")).await;

    controller.reset().await;
    assert!(controller.calls().await.is_empty());

    let got = mock.fetch(&Query::for_city("Berlin")).await;
    assert!(matches!(got, AdapterResult::RemoteEmpty));
}
