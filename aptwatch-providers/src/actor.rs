//! Shared actor-run protocol (§4.1 steps 3-4): the HTTP conversation every
//! provider adapter built on an external "actor" scraping service speaks,
//! independent of how each provider assembles its start parameters.
//!
//! Two run modes are supported:
//! - *Sync*: POST to the actor's "run and return dataset items" endpoint.
//! - *Async*: POST to "create run", poll the run status, then fetch items
//!   from the dataset endpoint once the run reaches a terminal state.
//!
//! Retries are applied per actor/URL pair: transport errors and empty
//! results are retried with backoff; rejections and quota failures are not.

use std::time::Duration;

use rand::Rng;
use serde_json::Value;

use aptwatch_types::config::RetryConfig;
use aptwatch_types::IngestError;

/// Terminal states reported by an actor run (§4.1 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The run is still in progress or queued.
    Running,
    /// The run completed and produced a dataset.
    Succeeded,
    /// The run failed.
    Failed,
    /// The run exceeded the actor's own time budget.
    TimedOut,
    /// The run was aborted (e.g. by the platform or an operator).
    Aborted,
}

impl RunStatus {
    fn from_str(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "TIMED-OUT" | "TIMED_OUT" => Self::TimedOut,
            "ABORTED" => Self::Aborted,
            _ => Self::Running,
        }
    }

    /// Whether this status represents a finished run (success or otherwise).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Thin wrapper over [`reqwest::Client`] speaking the actor-run protocol
/// against a single base URL (normally an Apify-style actor host).
#[derive(Debug, Clone)]
pub struct ActorClient {
    http: reqwest::Client,
    base_url: String,
}

impl ActorClient {
    /// Build a client against `base_url` (no trailing slash expected).
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Run the actor synchronously and return the parsed dataset items.
    ///
    /// POSTs `body` to `/acts/{actor_id}/run-sync-get-dataset-items`.
    async fn run_sync(
        &self,
        source: &str,
        actor_id: &str,
        token: &str,
        body: &Value,
    ) -> Result<Vec<Value>, IngestError> {
        let url = format!(
            "{}/acts/{actor_id}/run-sync-get-dataset-items?token={token}",
            self.base_url
        );
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| IngestError::transport(source, e.to_string()))?;
        Self::handle_items_response(source, resp).await
    }

    /// Run the actor asynchronously: create a run, poll its status every
    /// ~2s up to ~60 iterations, then fetch dataset items on a terminal
    /// state.
    async fn run_async(
        &self,
        source: &str,
        actor_id: &str,
        token: &str,
        body: &Value,
    ) -> Result<Vec<Value>, IngestError> {
        let create_url = format!("{}/acts/{actor_id}/runs?token={token}", self.base_url);
        let resp = self
            .http
            .post(&create_url)
            .json(body)
            .send()
            .await
            .map_err(|e| IngestError::transport(source, e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 402 {
            return Err(IngestError::provider_quota(source, "actor run creation rejected: payment required"));
        }
        if status.is_client_error() {
            return Err(IngestError::provider_rejected(
                source,
                format!("run creation rejected with status {status}"),
            ));
        }
        let envelope: Value = resp
            .json()
            .await
            .map_err(|e| IngestError::parse(source, e.to_string()))?;

        let run_id = envelope
            .get("data")
            .and_then(|d| d.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| IngestError::parse(source, "missing data.id in run creation response"))?
            .to_string();

        let mut dataset_id = envelope
            .get("data")
            .and_then(|d| d.get("defaultDatasetId"))
            .and_then(Value::as_str)
            .map(str::to_string);

        const MAX_POLLS: u32 = 60;
        const POLL_INTERVAL: Duration = Duration::from_secs(2);

        for _ in 0..MAX_POLLS {
            let status_url = format!("{}/actor-runs/{run_id}?token={token}", self.base_url);
            let resp = self
                .http
                .get(&status_url)
                .send()
                .await
                .map_err(|e| IngestError::transport(source, e.to_string()))?;
            let envelope: Value = resp
                .json()
                .await
                .map_err(|e| IngestError::parse(source, e.to_string()))?;
            let data = envelope.get("data");
            let run_status = data
                .and_then(|d| d.get("status"))
                .and_then(Value::as_str)
                .map(RunStatus::from_str)
                .unwrap_or(RunStatus::Running);
            if dataset_id.is_none() {
                dataset_id = data
                    .and_then(|d| d.get("defaultDatasetId"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            if run_status.is_terminal() {
                if run_status != RunStatus::Succeeded {
                    return Err(IngestError::provider_rejected(
                        source,
                        format!("actor run finished with non-success status: {run_status:?}"),
                    ));
                }
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        let Some(dataset_id) = dataset_id else {
            return Err(IngestError::provider_rejected(
                source,
                "actor run never produced a dataset id",
            ));
        };

        let items_url = format!(
            "{}/datasets/{dataset_id}/items?token={token}",
            self.base_url
        );
        let resp = self
            .http
            .get(&items_url)
            .send()
            .await
            .map_err(|e| IngestError::transport(source, e.to_string()))?;
        Self::handle_items_response(source, resp).await
    }

    async fn handle_items_response(
        source: &str,
        resp: reqwest::Response,
    ) -> Result<Vec<Value>, IngestError> {
        let status = resp.status();
        if status.as_u16() == 402 {
            return Err(IngestError::provider_quota(source, "quota/payment required"));
        }
        if status.is_client_error() {
            return Err(IngestError::provider_rejected(
                source,
                format!("remote rejected with status {status}"),
            ));
        }
        if !status.is_success() {
            return Err(IngestError::transport(
                source,
                format!("unexpected status {status}"),
            ));
        }
        let items: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| IngestError::parse(source, e.to_string()))?;
        Ok(items)
    }

    /// Run a single attempt in the requested mode, with no retry applied.
    async fn run_once(
        &self,
        source: &str,
        actor_id: &str,
        token: &str,
        body: &Value,
        mode: aptwatch_types::config::RunMode,
    ) -> Result<Vec<Value>, IngestError> {
        match mode {
            aptwatch_types::config::RunMode::Sync => self.run_sync(source, actor_id, token, body).await,
            aptwatch_types::config::RunMode::Async => {
                self.run_async(source, actor_id, token, body).await
            }
        }
    }

    /// Run the actor with the retry policy applied (§4.1 step 4): up to
    /// `retry.max_attempts` attempts, backing off between them. Transport
    /// errors and empty results are retried; provider rejections, quota
    /// failures and fatal 4xx are not.
    pub async fn run_with_retry(
        &self,
        source: &str,
        actor_id: &str,
        token: &str,
        body: &Value,
        mode: aptwatch_types::config::RunMode,
        retry: &RetryConfig,
    ) -> Result<Vec<Value>, IngestError> {
        let mut last_err: Option<IngestError> = None;
        for attempt in 0..retry.max_attempts {
            if attempt > 0 {
                let backoff = retry
                    .backoffs
                    .get((attempt - 1) as usize)
                    .copied()
                    .unwrap_or_else(|| retry.backoffs.last().copied().unwrap_or(Duration::ZERO));
                tokio::time::sleep(jittered(backoff, retry.jitter_percent)).await;
            }
            match self.run_once(source, actor_id, token, body, mode).await {
                Ok(items) if items.is_empty() => {
                    last_err = Some(IngestError::Other(format!("{source}: remote returned no items")));
                }
                Ok(items) => return Ok(items),
                Err(e) if e.is_retryable() => {
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| IngestError::Other(format!("{source}: exhausted retries"))))
    }
}

fn jittered(base: Duration, jitter_percent: u8) -> Duration {
    if jitter_percent == 0 {
        return base;
    }
    let jitter_frac = f64::from(jitter_percent) / 100.0;
    let factor = rand::rng().random_range((1.0 - jitter_frac)..=(1.0 + jitter_frac));
    base.mul_f64(factor.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_parses_terminal_states() {
        assert!(RunStatus::from_str("SUCCEEDED").is_terminal());
        assert!(RunStatus::from_str("FAILED").is_terminal());
        assert!(RunStatus::from_str("TIMED-OUT").is_terminal());
        assert!(RunStatus::from_str("ABORTED").is_terminal());
        assert!(!RunStatus::from_str("RUNNING").is_terminal());
        assert!(!RunStatus::from_str("READY").is_terminal());
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_millis(1000);
        for _ in 0..50 {
            let d = jittered(base, 10);
            assert!(d >= Duration::from_millis(900));
            assert!(d <= Duration::from_millis(1100));
        }
    }
}
