//! The Scheduler / Ingestion Loop (§4.2-§4.3, §4.5): an adaptive
//! enqueuer feeding a fixed worker pool that fetches, deduplicates,
//! persists and dispatches listings, all coordinated through a small
//! Idle → Running → Stopping state machine.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::sleep;

use aptwatch_core::{AdapterResult, SharedAdapter};
use aptwatch_types::listing::Query;
use aptwatch_types::report::{AdapterReport, CycleReport, JobReport};
use aptwatch_types::{combined_feed, AppConfig, IngestError, Listing};

use crate::dedup::DedupStore;
use crate::dispatcher::NotificationDispatcher;
use crate::entities::{User, UserFilter};
use crate::gateway::PersistenceGateway;

/// Lifecycle state of the scheduler, mirroring the source's three-state
/// run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed but not yet started.
    Idle,
    /// Enqueuer and workers are active.
    Running,
    /// `stop()` has been called; waiting out `shutdown_grace` for workers
    /// to drain in-flight jobs.
    Stopping,
}

/// One unit of work handed to a worker: fetch every adapter for `city`
/// with `query`.
struct CityJob {
    city: String,
    query: Query,
}

/// Coordinates the enqueuer, worker pool and janitor sweep described in
/// §4.2-§4.3. Generic over nothing — collaborators are held as trait
/// objects so the scheduler can be driven from `tokio::spawn` without
/// lifetime gymnastics.
pub struct Scheduler {
    gateway: Arc<dyn PersistenceGateway>,
    adapters: Vec<SharedAdapter>,
    dedup: Arc<DedupStore>,
    dispatcher: Arc<NotificationDispatcher>,
    config: AppConfig,
    state: Mutex<SchedulerState>,
    shutdown: Notify,
    forced: AtomicBool,
    cycle_count: AtomicU32,
}

impl Scheduler {
    /// Build a scheduler. `dedup` should be pre-seeded from
    /// [`PersistenceGateway::known_surrogate_ids`] by the caller so a
    /// restart doesn't re-notify every existing listing.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        adapters: Vec<SharedAdapter>,
        dedup: Arc<DedupStore>,
        dispatcher: Arc<NotificationDispatcher>,
        config: AppConfig,
    ) -> Self {
        Self {
            gateway,
            adapters,
            dedup,
            dispatcher,
            config,
            state: Mutex::new(SchedulerState::Idle),
            shutdown: Notify::new(),
            forced: AtomicBool::new(false),
            cycle_count: AtomicU32::new(0),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SchedulerState {
        *self.state.lock().await
    }

    /// Run the adaptive enqueuer loop until [`Self::stop`] is called.
    ///
    /// Each tick builds the city job set from active subscriptions
    /// (falling back to the configured default city skeleton), fans those
    /// jobs out across a fixed worker pool, waits for the pool to drain,
    /// and sleeps for [`aptwatch_types::config::SchedulerConfig::effective_tick`]
    /// before the next tick.
    pub async fn run(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            if *state != SchedulerState::Idle {
                return;
            }
            *state = SchedulerState::Running;
        }

        loop {
            let tick = self.config.scheduler.effective_tick(Utc::now().hour());

            tokio::select! {
                () = self.shutdown.notified() => break,
                _ = self.run_cycle(self.forced.swap(false, Ordering::SeqCst)) => {}
            }

            tokio::select! {
                () = self.shutdown.notified() => break,
                () = sleep(tick) => {}
            }
        }

        let mut state = self.state.lock().await;
        *state = SchedulerState::Stopping;
        sleep(self.config.scheduler.shutdown_grace).await;
        *state = SchedulerState::Idle;
    }

    /// Request the loop started by [`Self::run`] to stop after its current
    /// cycle, waiting out the configured shutdown grace period.
    pub fn stop(&self) {
        self.shutdown.notify_waiters();
    }

    /// Trigger an out-of-band cycle that bypasses every adapter's cooldown
    /// gate, consumed by the next scheduled tick or by calling
    /// [`Self::run_cycle`] directly (the force-check API, §4.2).
    pub fn force_check(&self) {
        self.forced.store(true, Ordering::SeqCst);
    }

    /// Run one full enqueuer pass synchronously, returning its report.
    /// Exposed directly so tests and the force-check path don't have to
    /// wait for the next tick.
    pub async fn run_cycle(&self, forced: bool) -> Result<CycleReport, IngestError> {
        self.dispatcher.begin_cycle();
        let cities = self.active_cities().await?;
        #[cfg(feature = "tracing")]
        tracing::info!(cities = cities.len(), forced, "starting ingestion cycle");
        let is_quiet = self
            .config
            .scheduler
            .quiet_hours
            .contains(Utc::now().hour());

        let worker_count = self.config.scheduler.effective_worker_count();
        let (tx, rx) = mpsc::channel::<Option<CityJob>>(cities.len().max(1));
        let rx = Arc::new(Mutex::new(rx));
        let mut handles = Vec::with_capacity(worker_count);

        for _ in 0..worker_count {
            let rx = Arc::clone(&rx);
            let this = SchedulerWorkerCtx {
                gateway: Arc::clone(&self.gateway),
                adapters: self.adapters.clone(),
                dedup: Arc::clone(&self.dedup),
                dispatcher: Arc::clone(&self.dispatcher),
                max_per_job: self.config.scheduler.max_apartments_per_job,
            };
            handles.push(tokio::spawn(async move { this.drain(rx).await }));
        }

        let default = &self.config.scheduler.default_filters;
        for city in &cities {
            let mut query = Query::for_city(city.clone());
            query.bypass_cooldown = forced;
            query.is_quiet_hours = is_quiet;
            query.price_min = default.price_min;
            query.price_max = default.price_max;
            query.rooms_min = default.rooms_min;
            query.rooms_max = default.rooms_max;
            query.area_min = default.area_min;
            query.area_max = default.area_max;
            let _ = tx
                .send(Some(CityJob {
                    city: city.clone(),
                    query,
                }))
                .await;
        }
        for _ in 0..worker_count {
            let _ = tx.send(None).await;
        }
        drop(tx);

        let mut jobs = Vec::new();
        for handle in handles {
            if let Ok(mut reports) = handle.await {
                jobs.append(&mut reports);
            }
        }

        self.cycle_count.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "tracing")]
        tracing::info!(
            new_listings = jobs.iter().map(|j| j.new_listings).sum::<usize>(),
            notifications = jobs.iter().map(|j| j.notifications_sent).sum::<usize>(),
            "ingestion cycle finished"
        );
        Ok(CycleReport { jobs, forced })
    }

    /// Build a combined on-demand feed (§4.6, §8 scenario 6): query the
    /// Persistence Gateway and fan every adapter out in parallel for the
    /// same query, then interleave a persistence-first slice with a
    /// round-robin over the live results via [`aptwatch_types::combined_feed`].
    pub async fn on_demand_feed(&self, query: &Query, limit: usize) -> Result<Vec<Listing>, IngestError> {
        let persisted = self.gateway.find_listings(query, limit, 0).await?;
        let live = fetch_all_adapters(&self.adapters, query)
            .await
            .into_iter()
            .flat_map(AdapterResult::into_listings)
            .collect();
        Ok(combined_feed(persisted, live, limit))
    }

    /// Sweep listings past the configured retention window. Intended to
    /// run on its own low-frequency interval alongside [`Self::run`].
    pub async fn run_janitor(&self) -> Result<usize, IngestError> {
        let retention = chrono::Duration::from_std(self.config.scheduler.listing_retention)
            .unwrap_or(chrono::Duration::days(30));
        let purged = self.gateway.purge_listings_older_than(retention).await?;
        #[cfg(feature = "tracing")]
        tracing::info!(purged, "janitor sweep complete");
        Ok(purged)
    }

    async fn active_cities(&self) -> Result<Vec<String>, IngestError> {
        let users = self.gateway.users_with_active_subscriptions().await?;
        let mut cities = Vec::new();
        for user in &users {
            let filter = self.gateway.get_user_filter(&user.id).await?;
            let city = filter
                .and_then(|f| f.city)
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| self.config.scheduler.default_filters.city.clone());
            if !cities.contains(&city) {
                cities.push(city);
            }
        }
        if cities.is_empty() {
            cities.push(self.config.scheduler.default_filters.city.clone());
        }
        Ok(cities)
    }
}

/// Fan every adapter out concurrently for `query` (§4.6 step 1: "run all
/// Provider Adapters in parallel"), tolerating individual failures — a
/// failing adapter's result is folded in like any other, never aborting its
/// peers.
async fn fetch_all_adapters(adapters: &[SharedAdapter], query: &Query) -> Vec<AdapterResult> {
    futures::future::join_all(adapters.iter().map(|adapter| adapter.fetch(query))).await
}

struct SchedulerWorkerCtx {
    gateway: Arc<dyn PersistenceGateway>,
    adapters: Vec<SharedAdapter>,
    dedup: Arc<DedupStore>,
    dispatcher: Arc<NotificationDispatcher>,
    max_per_job: usize,
}

impl SchedulerWorkerCtx {
    async fn drain(
        self,
        rx: Arc<Mutex<mpsc::Receiver<Option<CityJob>>>>,
    ) -> Vec<JobReport> {
        let mut reports = Vec::new();
        loop {
            let job = {
                let mut rx = rx.lock().await;
                rx.recv().await
            };
            match job {
                None | Some(None) => break,
                Some(Some(job)) => {
                    reports.push(self.process_job(job).await);
                }
            }
        }
        reports
    }

    async fn process_job(&self, job: CityJob) -> JobReport {
        let mut report = JobReport {
            city: job.city.clone(),
            ..JobReport::default()
        };

        let results = fetch_all_adapters(&self.adapters, &job.query).await;

        let mut fetched = Vec::new();
        for (adapter, result) in self.adapters.iter().zip(results) {
            report.adapters.push(AdapterReport {
                source: adapter.source(),
                outcome: result.as_outcome(),
            });
            if let AdapterResult::TransportError(err) = &result {
                report.warnings.push(err.clone());
            }
            fetched.extend(result.into_listings());
        }

        let merged = aptwatch_types::round_robin_merge(fetched, self.max_per_job);

        let candidates = match self.notification_candidates().await {
            Ok(c) => c,
            Err(err) => {
                report.warnings.push(err);
                Vec::new()
            }
        };

        for listing in merged {
            if !self.dedup.record(&listing.surrogate_id) {
                report.duplicate_listings += 1;
                continue;
            }
            if let Err(err) = self.gateway.save_listing(listing.clone()).await {
                report.warnings.push(err);
                continue;
            }
            report.new_listings += 1;

            match self.dispatcher.dispatch(&listing, &candidates).await {
                Ok(outcome) => {
                    report.notifications_sent += outcome.sent as usize;
                    report.warnings.extend(outcome.warnings);
                }
                Err(err) => report.warnings.push(err),
            }
        }

        report
    }

    async fn notification_candidates(&self) -> Result<Vec<(User, UserFilter)>, IngestError> {
        let users = self.gateway.users_with_active_subscriptions().await?;
        let mut out = Vec::with_capacity(users.len());
        for user in users {
            let filter = self
                .gateway
                .get_user_filter(&user.id)
                .await?
                .unwrap_or_default();
            out.push((user, filter));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Language, Subscription, SubscriptionStatus};
    use crate::gateway::InMemoryGateway;
    use crate::messaging::NullMessagingSender;
    use aptwatch_mock::MockProviderAdapter;
    use aptwatch_types::config::NotificationConfig;
    use aptwatch_types::SourceKey;

    async fn seeded_gateway(city: &str) -> Arc<InMemoryGateway> {
        let gw = Arc::new(InMemoryGateway::new());
        gw.create_user(User {
            id: "u1".to_string(),
            language: Language::De,
        })
        .await
        .unwrap();
        gw.save_subscription(Subscription {
            user_id: "u1".to_string(),
            status: SubscriptionStatus::Active,
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::days(30),
        })
        .await
        .unwrap();
        gw.save_user_filter(
            "u1",
            UserFilter {
                city: Some(city.to_string()),
                ..UserFilter::default()
            },
        )
        .await
        .unwrap();
        gw
    }

    #[tokio::test]
    async fn run_cycle_persists_new_listings_and_notifies() {
        let gw = seeded_gateway("Berlin").await;
        let fixtures = aptwatch_mock::fixtures::immoscout24();
        let adapter: SharedAdapter =
            Arc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, fixtures.clone()));

        let dispatcher = Arc::new(NotificationDispatcher::new(
            gw.clone(),
            Arc::new(NullMessagingSender),
            NotificationConfig {
                throttle: Duration::from_millis(1),
                max_notify_per_cycle: 10,
            },
        ));
        let scheduler = Scheduler::new(
            gw.clone(),
            vec![adapter],
            Arc::new(DedupStore::new()),
            dispatcher,
            AppConfig::default(),
        );

        let report = scheduler.run_cycle(false).await.unwrap();
        assert_eq!(report.total_new_listings(), fixtures.len());
        assert_eq!(report.total_notifications_sent(), fixtures.len());
    }

    #[tokio::test]
    async fn run_cycle_deduplicates_already_known_listings() {
        let gw = seeded_gateway("Berlin").await;
        let fixtures = aptwatch_mock::fixtures::immoscout24();
        let adapter: SharedAdapter =
            Arc::new(MockProviderAdapter::with_fixtures(SourceKey::IMMOSCOUT24, fixtures.clone()));
        let dedup = Arc::new(DedupStore::from_known(
            fixtures.iter().map(|l| l.surrogate_id.clone()),
        ));

        let dispatcher = Arc::new(NotificationDispatcher::new(
            gw.clone(),
            Arc::new(NullMessagingSender),
            NotificationConfig {
                throttle: Duration::from_millis(1),
                max_notify_per_cycle: 10,
            },
        ));
        let scheduler = Scheduler::new(gw, vec![adapter], dedup, dispatcher, AppConfig::default());

        let report = scheduler.run_cycle(false).await.unwrap();
        assert_eq!(report.total_new_listings(), 0);
        assert_eq!(
            report.jobs.iter().map(|j| j.duplicate_listings).sum::<usize>(),
            fixtures.len()
        );
    }

    #[tokio::test]
    async fn falls_back_to_default_city_with_no_subscribers() {
        let gw = Arc::new(InMemoryGateway::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            gw.clone(),
            Arc::new(NullMessagingSender),
            NotificationConfig::default(),
        ));
        let scheduler = Scheduler::new(gw, vec![], Arc::new(DedupStore::new()), dispatcher, AppConfig::default());
        let report = scheduler.run_cycle(false).await.unwrap();
        assert_eq!(report.jobs.len(), 1);
    }

    #[tokio::test]
    async fn on_demand_feed_puts_persistence_first_then_round_robins_live_adapters() {
        let gw = Arc::new(InMemoryGateway::new());
        let mut persisted = aptwatch_mock::fixtures::kleinanzeigen().into_iter().next().unwrap();
        persisted.external_id = "persisted-1".to_string();
        gw.save_listing(persisted).await.unwrap();

        let is24: SharedAdapter = Arc::new(MockProviderAdapter::with_fixtures(
            SourceKey::IMMOSCOUT24,
            aptwatch_mock::fixtures::immoscout24(),
        ));
        let immowelt: SharedAdapter = Arc::new(MockProviderAdapter::with_fixtures(
            SourceKey::IMMOWELT,
            aptwatch_mock::fixtures::immowelt(),
        ));

        let dispatcher = Arc::new(NotificationDispatcher::new(
            gw.clone(),
            Arc::new(NullMessagingSender),
            NotificationConfig::default(),
        ));
        let scheduler = Scheduler::new(
            gw,
            vec![is24, immowelt],
            Arc::new(DedupStore::new()),
            dispatcher,
            AppConfig::default(),
        );

        let query = Query::for_city("Berlin");
        let feed = scheduler.on_demand_feed(&query, 4).await.unwrap();

        assert_eq!(feed.len(), 4);
        assert_eq!(feed[0].source, SourceKey::KLEINANZEIGEN);
        let live_sources: Vec<SourceKey> = feed[1..].iter().map(|l| l.source).collect();
        assert_eq!(
            live_sources,
            vec![SourceKey::IMMOSCOUT24, SourceKey::IMMOWELT, SourceKey::IMMOSCOUT24]
        );
    }
}
