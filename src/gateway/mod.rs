// External collaborators: metrics backend and usecase-parameter service.

mod prometheus;
mod usecase;

pub use prometheus::PrometheusGateway;
pub use usecase::HttpUsecaseParams;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Metric;

/// Closed sampling interval in epoch seconds. Metrics are sampled at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureWindow {
    pub begin: i64,
    pub end: i64,
}

impl CaptureWindow {
    /// Whole seconds between begin and end; 0 when end <= begin.
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.begin).max(0)
    }
}

/// One result row for one metric series. Labels are optional; value is the raw sample string.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRow {
    pub device: Option<String>,
    pub interface: Option<String>,
    pub value: String,
}

#[async_trait]
pub trait MetricsGateway: Send + Sync {
    /// Per-(device, interface) values of `metric` aggregated over `window`.
    async fn query_metric(&self, metric: Metric, window: CaptureWindow) -> Result<Vec<GatewayRow>>;
}

#[async_trait]
pub trait UsecaseParams: Send + Sync {
    /// Positive traffic scale divisor for scaled diffs of `network` under `usecase`.
    async fn traffic_scale(&self, usecase: &str, network: &str) -> Result<f64>;
}
