//! Configuration surface for the ingestion-and-distribution engine.
//!
//! Every value here has a conservative default matching the upstream
//! service's historical tuning; all of them are overridable from the
//! environment by [`AppConfig::from_env`] in the `aptwatch` crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A local-time-of-day window, expressed in hours `[0, 24)`. May wrap past
/// midnight (`start > end`), e.g. `23..7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    /// Hour the quiet window begins, inclusive.
    pub start_hour: u32,
    /// Hour the quiet window ends, exclusive.
    pub end_hour: u32,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            start_hour: 23,
            end_hour: 7,
        }
    }
}

impl QuietHours {
    /// Whether `hour` (local time, `[0, 24)`) falls inside this window.
    #[must_use]
    pub const fn contains(&self, hour: u32) -> bool {
        if self.start_hour == self.end_hour {
            return false;
        }
        if self.start_hour < self.end_hour {
            self.start_hour <= hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Per-adapter cost-control configuration (§4.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Minimum wall-clock duration between two runs of the same adapter.
    pub base_cooldown: Duration,
    /// Multiplier applied to `base_cooldown` during quiet hours.
    pub quiet_scaling: f64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            base_cooldown: Duration::from_secs(300),
            quiet_scaling: 2.0,
        }
    }
}

impl CooldownConfig {
    /// Effective cooldown for the current moment, scaled if `is_quiet`.
    #[must_use]
    pub fn effective(&self, is_quiet: bool) -> Duration {
        if is_quiet {
            self.base_cooldown.mul_f64(self.quiet_scaling)
        } else {
            self.base_cooldown
        }
    }
}

/// Retry/backoff configuration for a single actor/URL attempt (§4.1 step 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per actor/URL pair.
    pub max_attempts: u32,
    /// Backoff delay before each retry, in order (attempt 2, 3, ...).
    pub backoffs: Vec<Duration>,
    /// Random jitter percentage `[0, 100]` added to each backoff.
    pub jitter_percent: u8,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoffs: vec![
                Duration::from_millis(500),
                Duration::from_millis(1500),
                Duration::from_millis(3000),
            ],
            jitter_percent: 10,
        }
    }
}

/// How a Provider Adapter executes its underlying actor run (§4.1 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RunMode {
    /// POST to "run and return dataset items" and parse the response body.
    #[default]
    Sync,
    /// POST to "create run", poll run status, then fetch dataset items.
    Async,
}

/// Per-provider actor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether this provider is enabled at all.
    pub enabled: bool,
    /// Bearer token for the actor service.
    pub token: Option<String>,
    /// Actor identifier to invoke.
    pub actor_id: String,
    /// Sync vs async run mode.
    pub run_mode: RunMode,
    /// Maximum items requested per run.
    pub max_items: u32,
    /// Maximum pages the actor should scrape per run.
    pub max_pages: u32,
    /// Cost controls for this provider.
    pub cooldown: CooldownConfig,
    /// Retry policy for this provider.
    pub retry: RetryConfig,
}

impl ProviderConfig {
    /// A disabled placeholder configuration for a named actor id.
    #[must_use]
    pub fn disabled(actor_id: impl Into<String>) -> Self {
        Self {
            enabled: false,
            token: None,
            actor_id: actor_id.into(),
            run_mode: RunMode::Sync,
            max_items: 30,
            max_pages: 1,
            cooldown: CooldownConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Default search bounds substituted when a user has not set a filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultFilterSkeleton {
    /// Default city when a user has no filter city set.
    pub city: String,
    /// Default minimum price bound.
    pub price_min: Option<rust_decimal::Decimal>,
    /// Default maximum price bound.
    pub price_max: Option<rust_decimal::Decimal>,
    /// Default minimum rooms bound.
    pub rooms_min: Option<rust_decimal::Decimal>,
    /// Default maximum rooms bound.
    pub rooms_max: Option<rust_decimal::Decimal>,
    /// Default minimum area bound.
    pub area_min: Option<rust_decimal::Decimal>,
    /// Default maximum area bound.
    pub area_max: Option<rust_decimal::Decimal>,
}

impl Default for DefaultFilterSkeleton {
    fn default() -> Self {
        use rust_decimal::Decimal;
        Self {
            city: "Berlin".to_string(),
            price_min: Some(Decimal::from(500)),
            price_max: Some(Decimal::from(1500)),
            rooms_min: Some(Decimal::from(1)),
            rooms_max: Some(Decimal::from(4)),
            area_min: Some(Decimal::from(30)),
            area_max: Some(Decimal::from(120)),
        }
    }
}

/// Scheduler/ingestion-loop timing configuration (§4.6, §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Enqueuer tick interval during normal hours.
    pub check_interval_normal: Duration,
    /// Enqueuer tick interval during quiet hours.
    pub check_interval_quiet: Duration,
    /// Quiet-hours window.
    pub quiet_hours: QuietHours,
    /// Number of worker tasks draining the job queue.
    pub worker_count: usize,
    /// Hard cap on listings processed per city per iteration.
    pub max_apartments_per_job: usize,
    /// Grace window the Stopping state waits for workers to finish.
    pub shutdown_grace: Duration,
    /// Default filter bounds substituted for users without a stored filter.
    pub default_filters: DefaultFilterSkeleton,
    /// Retention window after which a janitor purges stale listings.
    pub listing_retention: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_normal: Duration::from_secs(30),
            check_interval_quiet: Duration::from_secs(300),
            quiet_hours: QuietHours::default(),
            worker_count: 6,
            max_apartments_per_job: 15,
            shutdown_grace: Duration::from_secs(30),
            default_filters: DefaultFilterSkeleton::default(),
            listing_retention: Duration::from_secs(60 * 60 * 24 * 30),
        }
    }
}

impl SchedulerConfig {
    /// Normalize `worker_count` the way the upstream service does:
    /// `max(4, min(10, configured))`.
    #[must_use]
    pub fn effective_worker_count(&self) -> usize {
        self.worker_count.clamp(4, 10)
    }

    /// The effective enqueuer tick for the given local hour, capped at 30s
    /// during business hours `09:00-18:00` regardless of quiet-hours state.
    #[must_use]
    pub fn effective_tick(&self, local_hour: u32) -> Duration {
        let is_quiet = self.quiet_hours.contains(local_hour);
        let base = if is_quiet {
            self.check_interval_quiet
        } else {
            self.check_interval_normal
        };
        if (9..=18).contains(&local_hour) {
            base.min(Duration::from_secs(30))
        } else {
            base
        }
    }
}

/// Per-user notification delivery configuration (§4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Minimum delay between two deliveries to the same user.
    pub throttle: Duration,
    /// Maximum deliveries to a single user per scheduler cycle.
    pub max_notify_per_cycle: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            throttle: Duration::from_secs(2),
            max_notify_per_cycle: 8,
        }
    }
}

/// Time-bounded best-effort description/image enrichment configuration (§4.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Whether description/image enrichment is attempted at all.
    pub enabled: bool,
    /// Deadline for a single enrichment fetch.
    pub timeout: Duration,
    /// TTL for cached enrichment results, keyed by canonical URL.
    pub cache_ttl: Duration,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(12),
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

/// Feature flags gating optional behavior (§6).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Enable the live Immowelt actor (disabled by default to avoid wasted runs).
    pub enable_immowelt_live: bool,
    /// Enable the AI narrative generator collaborator.
    pub enable_ai: bool,
    /// Enable the public-OSM fallback source.
    pub enable_public_osm: bool,
    /// Enable the placeholder-RSS fallback source.
    pub enable_placeholder_rss: bool,
    /// Enable demo mode (synthetic data, no live provider calls).
    pub enable_demo: bool,
}

/// Top-level configuration for the aptwatch engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scheduler/ingestion-loop timing.
    pub scheduler: SchedulerConfig,
    /// Notification dispatch limits.
    pub notifications: NotificationConfig,
    /// Description/image enrichment behavior.
    pub enrichment: EnrichmentConfig,
    /// Feature flags.
    pub features: FeatureFlags,
    /// Hard cap on price considered by any filter or default skeleton.
    pub max_price_cap: rust_decimal::Decimal,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            notifications: NotificationConfig::default(),
            enrichment: EnrichmentConfig::default(),
            features: FeatureFlags::default(),
            max_price_cap: rust_decimal::Decimal::from(5000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_hours_wraps_midnight() {
        let q = QuietHours {
            start_hour: 23,
            end_hour: 7,
        };
        assert!(q.contains(2));
        assert!(q.contains(23));
        assert!(!q.contains(12));
        assert!(!q.contains(7));
    }

    #[test]
    fn business_hours_cap_tick_at_30s() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.effective_tick(12), Duration::from_secs(30));
        assert_eq!(cfg.effective_tick(3), Duration::from_secs(300));
        assert_eq!(cfg.effective_tick(20), Duration::from_secs(30));
    }

    #[test]
    fn worker_count_clamped() {
        let mut cfg = SchedulerConfig::default();
        cfg.worker_count = 1;
        assert_eq!(cfg.effective_worker_count(), 4);
        cfg.worker_count = 50;
        assert_eq!(cfg.effective_worker_count(), 10);
        cfg.worker_count = 6;
        assert_eq!(cfg.effective_worker_count(), 6);
    }

    #[test]
    fn cooldown_scales_in_quiet_hours() {
        let cd = CooldownConfig::default();
        assert_eq!(cd.effective(false), Duration::from_secs(300));
        assert_eq!(cd.effective(true), Duration::from_secs(600));
    }
}
