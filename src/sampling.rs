// Sampling state machine: begin/end ordering per (network, snapshot) and capture on end.
// Actions on the same key are serialized; different keys run independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::capture::capture_statistics;
use crate::error::{ConductorError, Result};
use crate::gateway::{CaptureWindow, MetricsGateway};
use crate::models::{ActionOutcome, SamplingAction, SamplingRecord};
use crate::store::{SamplingRepo, now_secs};

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub struct SamplingMachine {
    repo: Arc<SamplingRepo>,
    gateway: Arc<dyn MetricsGateway>,
    capture_timeout: Duration,
    clock: Clock,
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl SamplingMachine {
    pub fn new(
        repo: Arc<SamplingRepo>,
        gateway: Arc<dyn MetricsGateway>,
        capture_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            gateway,
            capture_timeout,
            clock: Arc::new(now_secs),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the wall clock (epoch seconds) used for markers.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Current interval record; idle when the key was never sampled.
    pub async fn status(&self, network: &str, snapshot: &str) -> Result<SamplingRecord> {
        self.repo.load_record(network, snapshot).await
    }

    /// Applies "begin" or "end". Unknown actions fail before any state is read.
    #[instrument(skip(self), fields(operation = "apply_action"))]
    pub async fn apply_action(
        &self,
        network: &str,
        snapshot: &str,
        action: &str,
    ) -> Result<ActionOutcome> {
        let action = action.parse::<SamplingAction>().map_err(|e| match e {
            ConductorError::Validation(msg) => ConductorError::Validation(format!(
                "{} (network={}, snapshot={})",
                msg, network, snapshot
            )),
            other => other,
        })?;

        let lock = self.key_lock(network, snapshot).await;
        let _guard = lock.lock().await;

        let current = self.repo.load_record(network, snapshot).await?;
        let timestamp = match action {
            SamplingAction::Begin => self.begin(&current).await?,
            SamplingAction::End => self.end(&current).await?,
        };
        info!(network, snapshot, %action, timestamp, "sampling action applied");
        Ok(ActionOutcome {
            network: network.to_string(),
            snapshot: snapshot.to_string(),
            action,
            timestamp,
        })
    }

    async fn begin(&self, current: &SamplingRecord) -> Result<i64> {
        if current.is_open() {
            return Err(ConductorError::conflict(
                &current.network,
                &current.snapshot,
                SamplingAction::Begin.as_str(),
                "sampling already in progress",
            ));
        }
        let ts = (self.clock)();
        self.repo
            .record_action_at(current, SamplingAction::Begin, ts)
            .await?;
        Ok(ts)
    }

    /// Captures first, then persists end marker and statistics together. On capture
    /// failure or timeout nothing is written and the interval stays open for a retry.
    async fn end(&self, current: &SamplingRecord) -> Result<i64> {
        if !current.is_open() {
            return Err(ConductorError::NotFound(format!(
                "no sampling in progress (network={}, snapshot={}, action=end)",
                current.network, current.snapshot
            )));
        }
        let begin = current.begin.ok_or_else(|| {
            ConductorError::Storage(format!(
                "open interval without begin marker for {}/{}",
                current.network, current.snapshot
            ))
        })?;
        let end = (self.clock)().max(begin);
        let window = CaptureWindow { begin, end };

        let capture = capture_statistics(self.gateway.as_ref(), window);
        let tree = match tokio::time::timeout(self.capture_timeout, capture).await {
            Ok(Ok(tree)) => tree,
            Ok(Err(e)) => {
                warn!(network = %current.network, snapshot = %current.snapshot, error = %e, "metric capture failed");
                return Err(e);
            }
            Err(_) => {
                warn!(network = %current.network, snapshot = %current.snapshot, "metric capture timed out");
                return Err(ConductorError::Gateway(format!(
                    "metric capture timed out after {}s",
                    self.capture_timeout.as_secs_f64()
                )));
            }
        };

        self.repo.close_interval(current, end, &tree).await?;
        Ok(end)
    }

    async fn key_lock(&self, network: &str, snapshot: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // Drop locks nobody holds any more.
        locks.retain(|_, l| Arc::strong_count(l) > 1);
        locks
            .entry((network.to_string(), snapshot.to_string()))
            .or_default()
            .clone()
    }
}
