//! The Notification Dispatcher (§4.5): fans a freshly accepted listing out
//! to every subscribed user whose filter matches it, honoring a per-user
//! throttle, a per-cycle delivery cap, and at-most-once delivery recorded
//! through the [`crate::gateway::PersistenceGateway`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;

use aptwatch_types::config::NotificationConfig;
use aptwatch_types::{IngestError, Listing};

use crate::entities::NotificationRecord;
use crate::gateway::PersistenceGateway;
use crate::matcher;
use crate::messaging::MessagingSender;

/// Tracks per-user delivery counters for the current scheduler cycle and
/// the timestamp of each user's last delivery, enforcing the throttle and
/// cap independently of the persistence layer (§4.5: these are cycle-local
/// controls, not audit state).
///
/// Holds its collaborators as trait objects so one dispatcher instance can
/// be shared (via `Arc`) across the scheduler's worker pool.
pub struct NotificationDispatcher {
    gateway: Arc<dyn PersistenceGateway>,
    messaging: Arc<dyn MessagingSender>,
    config: NotificationConfig,
    last_sent: Mutex<HashMap<String, chrono::DateTime<Utc>>>,
    sent_this_cycle: Mutex<HashMap<String, u32>>,
}

/// Outcome of one [`NotificationDispatcher::dispatch`] call: how many
/// candidates were actually notified, and any per-candidate delivery or
/// persistence failures that were logged and skipped along the way.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Number of notifications actually sent and recorded.
    pub sent: u32,
    /// Non-fatal per-candidate failures encountered during this call.
    pub warnings: Vec<IngestError>,
}

impl NotificationDispatcher {
    /// Build a dispatcher over `gateway`/`messaging` using `config`'s
    /// throttle and per-cycle cap.
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        messaging: Arc<dyn MessagingSender>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            gateway,
            messaging,
            config,
            last_sent: Mutex::new(HashMap::new()),
            sent_this_cycle: Mutex::new(HashMap::new()),
        }
    }

    /// Reset the per-cycle delivery counters. Call once at the start of
    /// every scheduler cycle.
    pub fn begin_cycle(&self) {
        self.sent_this_cycle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    /// Notify every user in `candidates` whose filter matches `listing`,
    /// applying the per-user throttle and per-cycle cap and skipping users
    /// already notified about this exact listing. Returns the number of
    /// notifications actually sent alongside any per-candidate failures.
    ///
    /// A delivery or persistence failure for one candidate is logged and
    /// skipped rather than aborting the remaining candidates (§4.6 step 4):
    /// the listing has already been marked as seen by the caller, so
    /// aborting here would make it a permanent duplicate instead of a
    /// candidate for retry on a future cycle (§7).
    pub async fn dispatch(
        &self,
        listing: &Listing,
        candidates: &[(crate::entities::User, crate::entities::UserFilter)],
    ) -> Result<DispatchOutcome, IngestError> {
        let mut outcome = DispatchOutcome::default();
        for (user, filter) in candidates {
            if !matcher::matches(listing, filter) {
                continue;
            }
            if self
                .gateway
                .has_notification(&user.id, &listing.surrogate_id)
                .await?
            {
                continue;
            }
            if self.at_cycle_cap(&user.id) {
                continue;
            }
            self.wait_out_throttle(&user.id).await;

            if let Err(err) = self
                .messaging
                .send_listing(&user.id, listing, user.language)
                .await
            {
                #[cfg(feature = "tracing")]
                tracing::warn!(user_id = %user.id, listing = %listing.surrogate_id, error = %err, "notification delivery failed, skipping candidate");
                outcome.warnings.push(err);
                continue;
            }

            if let Err(err) = self
                .gateway
                .save_notification(NotificationRecord {
                    user_id: user.id.clone(),
                    listing_surrogate_id: listing.surrogate_id.clone(),
                    sent_at: Utc::now(),
                })
                .await
            {
                #[cfg(feature = "tracing")]
                tracing::warn!(user_id = %user.id, listing = %listing.surrogate_id, error = %err, "failed to record notification, skipping candidate");
                outcome.warnings.push(err);
                continue;
            }

            self.record_sent(&user.id);
            outcome.sent += 1;
            #[cfg(feature = "tracing")]
            tracing::debug!(user_id = %user.id, listing = %listing.surrogate_id, "notification delivered");
        }
        Ok(outcome)
    }

    fn at_cycle_cap(&self, user_id: &str) -> bool {
        let counts = self
            .sent_this_cycle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        counts.get(user_id).copied().unwrap_or(0) >= self.config.max_notify_per_cycle
    }

    fn record_sent(&self, user_id: &str) {
        *self
            .sent_this_cycle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(user_id.to_string())
            .or_insert(0) += 1;
        self.last_sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(user_id.to_string(), Utc::now());
    }

    async fn wait_out_throttle(&self, user_id: &str) {
        let last = self
            .last_sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(user_id)
            .copied();
        let Some(last) = last else { return };
        let elapsed = Utc::now().signed_duration_since(last);
        let Ok(elapsed) = elapsed.to_std() else { return };
        if elapsed < self.config.throttle {
            sleep(self.config.throttle - elapsed).await;
        }
    }
}

/// Helper mirroring the source's jitter-free constant throttle, exposed for
/// callers that want to wait out a throttle window without a dispatcher
/// instance (e.g. tests).
#[must_use]
pub fn throttle_remaining(last_sent: Option<chrono::DateTime<Utc>>, throttle: Duration) -> Duration {
    let Some(last) = last_sent else {
        return Duration::ZERO;
    };
    let elapsed = Utc::now().signed_duration_since(last).to_std().unwrap_or(Duration::ZERO);
    throttle.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Language, User, UserFilter};
    use crate::gateway::InMemoryGateway;
    use crate::messaging::NullMessagingSender;
    use aptwatch_mock::fixtures;

    fn config() -> NotificationConfig {
        NotificationConfig {
            throttle: Duration::from_millis(1),
            max_notify_per_cycle: 2,
        }
    }

    #[tokio::test]
    async fn dispatch_skips_non_matching_users() {
        let gw = Arc::new(InMemoryGateway::new());
        let dispatcher = NotificationDispatcher::new(gw, Arc::new(NullMessagingSender), config());
        let listing = fixtures::immoscout24().into_iter().next().unwrap();
        let user = User {
            id: "u1".to_string(),
            language: Language::De,
        };
        let mut filter = UserFilter::default();
        filter.city = Some("Hamburg".to_string());

        let outcome = dispatcher
            .dispatch(&listing, &[(user, filter)])
            .await
            .unwrap();
        assert_eq!(outcome.sent, 0);
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn dispatch_is_at_most_once_per_listing() {
        let gw = Arc::new(InMemoryGateway::new());
        let dispatcher = NotificationDispatcher::new(gw, Arc::new(NullMessagingSender), config());
        let listing = fixtures::immoscout24().into_iter().next().unwrap();
        let user = User {
            id: "u1".to_string(),
            language: Language::De,
        };
        let filter = UserFilter::default();

        let first = dispatcher
            .dispatch(&listing, &[(user.clone(), filter.clone())])
            .await
            .unwrap();
        let second = dispatcher
            .dispatch(&listing, &[(user, filter)])
            .await
            .unwrap();
        assert_eq!(first.sent, 1);
        assert_eq!(second.sent, 0);
    }

    #[tokio::test]
    async fn dispatch_respects_per_cycle_cap() {
        let gw = Arc::new(InMemoryGateway::new());
        let dispatcher = NotificationDispatcher::new(gw, Arc::new(NullMessagingSender), config());
        let user = User {
            id: "u1".to_string(),
            language: Language::De,
        };
        let filter = UserFilter::default();
        let listings = fixtures::immoscout24();
        let extra = fixtures::immowelt();
        let kleinanzeigen = fixtures::kleinanzeigen();

        let mut total = 0;
        for listing in listings.iter().chain(extra.iter()).chain(kleinanzeigen.iter()) {
            total += dispatcher
                .dispatch(listing, &[(user.clone(), filter.clone())])
                .await
                .unwrap()
                .sent;
        }
        assert!(total <= config().max_notify_per_cycle);
    }

    /// A messaging failure for one candidate must not abort the remaining
    /// candidates in the same `dispatch` call, and must not be recorded as
    /// delivered (so a future cycle can retry it).
    #[tokio::test]
    async fn dispatch_continues_past_a_failed_candidate() {
        let gw = Arc::new(InMemoryGateway::new());
        let dispatcher = NotificationDispatcher::new(
            gw.clone(),
            Arc::new(crate::messaging::tests::FailingMessagingSender::new("u1")),
            config(),
        );
        let listing = fixtures::immoscout24().into_iter().next().unwrap();
        let failing_user = User {
            id: "u1".to_string(),
            language: Language::De,
        };
        let healthy_user = User {
            id: "u2".to_string(),
            language: Language::De,
        };
        let filter = UserFilter::default();

        let outcome = dispatcher
            .dispatch(
                &listing,
                &[
                    (failing_user.clone(), filter.clone()),
                    (healthy_user.clone(), filter.clone()),
                ],
            )
            .await
            .unwrap();

        assert_eq!(outcome.sent, 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(!gw
            .has_notification(&failing_user.id, &listing.surrogate_id)
            .await
            .unwrap());
        assert!(gw
            .has_notification(&healthy_user.id, &listing.surrogate_id)
            .await
            .unwrap());
    }
}
