//! Environment-driven configuration loading (§6).
//!
//! Mirrors the source's `Config` module: every knob lives in an environment
//! variable with a sane default, read once at process start via
//! [`load_app_config`] / [`load_provider_configs`]. `.env` files are loaded
//! with `dotenvy` when present (harmless no-op in a deployed container that
//! sets real environment variables).

use std::env;
use std::time::Duration;

use rust_decimal::Decimal;

use aptwatch_types::config::{
    AppConfig, CooldownConfig, DefaultFilterSkeleton, EnrichmentConfig, FeatureFlags,
    NotificationConfig, ProviderConfig, QuietHours, RetryConfig, RunMode, SchedulerConfig,
};

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_decimal_opt(key: &str) -> Option<Decimal> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Load `.env` (if present) and build the full [`AppConfig`] from the
/// environment, falling back to the defaults baked into each config type
/// when a variable is unset.
#[must_use]
pub fn load_app_config() -> AppConfig {
    let _ = dotenvy::dotenv();

    let quiet_hours = QuietHours {
        start_hour: env_u32("QUIET_HOURS_START", QuietHours::default().start_hour),
        end_hour: env_u32("QUIET_HOURS_END", QuietHours::default().end_hour),
    };

    let default_filters = DefaultFilterSkeleton {
        city: env_string("DEFAULT_CITY", "Berlin"),
        price_min: env_decimal_opt("DEFAULT_PRICE_MIN"),
        price_max: env_decimal_opt("DEFAULT_PRICE_MAX"),
        rooms_min: env_decimal_opt("DEFAULT_ROOMS_MIN"),
        rooms_max: env_decimal_opt("DEFAULT_ROOMS_MAX"),
        area_min: env_decimal_opt("DEFAULT_AREA_MIN"),
        area_max: env_decimal_opt("DEFAULT_AREA_MAX"),
    };

    let scheduler = SchedulerConfig {
        check_interval_normal: Duration::from_secs(env_u64("CHECK_INTERVAL_NORMAL_SECS", 30)),
        check_interval_quiet: Duration::from_secs(env_u64("CHECK_INTERVAL_QUIET_SECS", 300)),
        quiet_hours,
        worker_count: env_usize("MAX_WORKERS", 6),
        max_apartments_per_job: env_usize("MAX_APARTMENTS_PER_JOB", 15),
        shutdown_grace: Duration::from_secs(env_u64("SHUTDOWN_GRACE_SECS", 30)),
        default_filters,
        listing_retention: Duration::from_secs(env_u64("LISTING_RETENTION_SECS", 30 * 24 * 3600)),
    };

    let notifications = NotificationConfig {
        throttle: Duration::from_millis(env_u64("NOTIFY_THROTTLE_MS", 2000)),
        max_notify_per_cycle: env_u32("MAX_NOTIFY_PER_CYCLE", 8),
    };

    let enrichment = EnrichmentConfig {
        enabled: env_bool("ENRICHMENT_ENABLED", true),
        timeout: Duration::from_secs(env_u64("ENRICHMENT_TIMEOUT_SECS", 12)),
        cache_ttl: Duration::from_secs(env_u64("ENRICHMENT_CACHE_TTL_SECS", 3600)),
    };

    let features = FeatureFlags {
        enable_immowelt_live: env_bool("FEATURE_IMMOWELT_LIVE", false),
        enable_ai: env_bool("FEATURE_AI", false),
        enable_public_osm: env_bool("FEATURE_PUBLIC_OSM", false),
        enable_placeholder_rss: env_bool("FEATURE_PLACEHOLDER_RSS", false),
        enable_demo: env_bool("FEATURE_DEMO", false),
    };

    AppConfig {
        scheduler,
        notifications,
        enrichment,
        features,
        max_price_cap: env_decimal("MAX_PRICE_CAP", Decimal::from(5000)),
    }
}

fn provider_config(prefix: &str, default_actor_id: &str) -> ProviderConfig {
    let token_key = format!("{prefix}_TOKEN");
    let actor_key = format!("{prefix}_ACTOR_ID");
    let enabled_key = format!("{prefix}_ENABLED");
    let run_mode_key = format!("{prefix}_RUN_MODE");
    let max_items_key = format!("{prefix}_MAX_ITEMS");
    let max_pages_key = format!("{prefix}_MAX_PAGES");
    let cooldown_key = format!("{prefix}_COOLDOWN_SECS");
    let quiet_scaling_key = format!("{prefix}_QUIET_SCALING");

    let token = env::var(&token_key).ok();
    ProviderConfig {
        enabled: env_bool(&enabled_key, token.is_some()),
        actor_id: env_string(&actor_key, default_actor_id),
        run_mode: match env::var(&run_mode_key).as_deref() {
            Ok("async") | Ok("Async") => RunMode::Async,
            _ => RunMode::Sync,
        },
        max_items: env_u32(&max_items_key, 30),
        max_pages: env_u32(&max_pages_key, 1),
        cooldown: CooldownConfig {
            base_cooldown: Duration::from_secs(env_u64(&cooldown_key, 300)),
            quiet_scaling: env_f64(&quiet_scaling_key, 2.0),
        },
        retry: RetryConfig::default(),
        token,
    }
}

/// Per-provider actor configuration for `ImmobilienScout24`, Immowelt and
/// Kleinanzeigen, each read from its own `<PROVIDER>_*` environment
/// variable group.
pub struct ProviderConfigs {
    /// `ImmobilienScout24` actor configuration.
    pub immoscout24: ProviderConfig,
    /// Immowelt actor configuration.
    pub immowelt: ProviderConfig,
    /// Kleinanzeigen actor configuration.
    pub kleinanzeigen: ProviderConfig,
}

/// Load per-provider actor configuration from the environment.
#[must_use]
pub fn load_provider_configs() -> ProviderConfigs {
    ProviderConfigs {
        immoscout24: provider_config("IMMOSCOUT24", "immoscout24-actor"),
        immowelt: provider_config("IMMOWELT", "immowelt-actor"),
        kleinanzeigen: provider_config("KLEINANZEIGEN", "kleinanzeigen-actor"),
    }
}
