//! Report envelopes produced by the scheduler and its workers.

use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::source::SourceKey;

/// Outcome of a single Provider Adapter attempt within one worker job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchOutcome {
    /// The adapter ran and returned `count` normalized listings.
    Items {
        /// Number of listings returned.
        count: usize,
    },
    /// The adapter refused to run because its cooldown has not elapsed.
    SkippedCooldown,
    /// The upstream actor rejected every payload/URL variant attempted.
    RemoteRejected,
    /// The upstream actor ran successfully but returned no items.
    RemoteEmpty,
    /// A transport-level failure exhausted its retry budget.
    TransportError,
}

/// Per-adapter summary for one worker job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterReport {
    /// Which adapter this entry describes.
    pub source: SourceKey,
    /// What happened when the adapter ran.
    pub outcome: FetchOutcome,
}

/// Summary of one worker job (one city, one enqueuer wave).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobReport {
    /// City this job targeted.
    pub city: String,
    /// Per-adapter outcomes for this job.
    pub adapters: Vec<AdapterReport>,
    /// Listings newly persisted (not already in the dedup store).
    pub new_listings: usize,
    /// Listings skipped because they already existed in the dedup store.
    pub duplicate_listings: usize,
    /// Listings dropped by the meaningful-content gate.
    pub discarded_listings: usize,
    /// Notifications successfully dispatched as a result of this job.
    pub notifications_sent: usize,
    /// Non-fatal issues encountered while processing this job.
    pub warnings: Vec<IngestError>,
}

/// Summary of one full enqueuer pass across every city job it produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleReport {
    /// Per-city job reports collected during this cycle.
    pub jobs: Vec<JobReport>,
    /// Whether this cycle bypassed adapter cooldowns (a force-check).
    pub forced: bool,
}

impl CycleReport {
    /// Total listings newly persisted across every job in this cycle.
    #[must_use]
    pub fn total_new_listings(&self) -> usize {
        self.jobs.iter().map(|j| j.new_listings).sum()
    }

    /// Total notifications dispatched across every job in this cycle.
    #[must_use]
    pub fn total_notifications_sent(&self) -> usize {
        self.jobs.iter().map(|j| j.notifications_sent).sum()
    }
}
