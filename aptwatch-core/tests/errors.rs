use aptwatch_core::IngestError;

#[test]
fn cooldown_active_is_not_actionable() {
    let err = IngestError::CooldownActive {
        source: "immowelt".into(),
        remaining_ms: 5_000,
    };
    assert!(!err.is_actionable());
}

#[test]
fn not_found_is_not_actionable() {
    let err = IngestError::not_found("subscription for user 42");
    assert!(!err.is_actionable());
}

#[test]
fn transport_is_actionable_and_retryable() {
    let err = IngestError::transport("immoscout24", "connection reset");
    assert!(err.is_actionable());
    assert!(err.is_retryable());
}

#[test]
fn provider_quota_is_actionable_but_not_retryable() {
    let err = IngestError::provider_quota("immowelt", "HTTP 402 payment required");
    assert!(err.is_actionable());
    assert!(!err.is_retryable());
}

#[test]
fn all_providers_failed_flattens_nested_aggregates() {
    let nested = IngestError::AllProvidersFailed(vec![
        IngestError::transport("immowelt", "timeout"),
        IngestError::AllProvidersFailed(vec![IngestError::provider_rejected(
            "kleinanzeigen",
            "captcha",
        )]),
    ]);
    let flat = nested.flatten();
    assert_eq!(flat.len(), 2);
    assert!(flat.iter().all(|e| !matches!(e, IngestError::AllProvidersFailed(_))));
}

#[test]
fn all_providers_failed_is_actionable_only_if_some_inner_is() {
    let all_benign = IngestError::AllProvidersFailed(vec![
        IngestError::CooldownActive {
            source: "immowelt".into(),
            remaining_ms: 1_000,
        },
        IngestError::not_found("listing"),
    ]);
    assert!(!all_benign.is_actionable());

    let mixed = IngestError::AllProvidersFailed(vec![
        IngestError::CooldownActive {
            source: "immowelt".into(),
            remaining_ms: 1_000,
        },
        IngestError::transport("immoscout24", "dns failure"),
    ]);
    assert!(mixed.is_actionable());
}
