//! Shared data transfer objects and configuration primitives for the
//! aptwatch real-estate listing-monitor ecosystem.
#![warn(missing_docs)]

pub mod config;
pub mod diversification;
pub mod error;
pub mod listing;
pub mod middleware;
pub mod numeric;
pub mod report;
pub mod source;

pub use config::AppConfig;
pub use diversification::{combined_feed, round_robin_merge};
pub use error::IngestError;
pub use listing::{Listing, Query, RawValue};
pub use middleware::{MiddlewareLayer, MiddlewareStack};
pub use report::{AdapterReport, CycleReport, FetchOutcome, JobReport};
pub use source::SourceKey;
