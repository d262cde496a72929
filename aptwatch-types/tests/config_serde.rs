use aptwatch_types::config::{AppConfig, CooldownConfig, QuietHours};

#[test]
fn app_config_roundtrip() {
    let cfg = AppConfig::default();
    let json = serde_json::to_string(&cfg).expect("serialize app config");
    let de: AppConfig = serde_json::from_str(&json).expect("deserialize app config");

    assert_eq!(de.notifications.max_notify_per_cycle, 8);
    assert_eq!(de.scheduler.worker_count, 6);
}

#[test]
fn cooldown_config_roundtrip() {
    let cfg = CooldownConfig {
        base_cooldown: std::time::Duration::from_secs(120),
        quiet_scaling: 3.0,
    };
    let json = serde_json::to_string(&cfg).expect("serialize cooldown config");
    let de: CooldownConfig = serde_json::from_str(&json).expect("deserialize cooldown config");
    assert_eq!(de.base_cooldown.as_secs(), 120);
    assert!((de.quiet_scaling - 3.0).abs() < f64::EPSILON);
}

#[test]
fn quiet_hours_serde_roundtrip() {
    let q = QuietHours {
        start_hour: 22,
        end_hour: 6,
    };
    let json = serde_json::to_string(&q).expect("serialize quiet hours");
    let de: QuietHours = serde_json::from_str(&json).expect("deserialize quiet hours");
    assert!(de.contains(23));
    assert!(!de.contains(12));
}
