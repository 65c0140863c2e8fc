// Prometheus instant-query client for interface rate series.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{CaptureWindow, GatewayRow, MetricsGateway};
use crate::config::MetricsConfig;
use crate::error::{ConductorError, Result};
use crate::models::{Direction, Metric};

pub struct PrometheusGateway {
    client: Client,
    base_url: String,
    scope: String,
    device_label: String,
    interface_label: String,
    rx_counter: String,
    tx_counter: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<QuerySample>,
}

#[derive(Debug, Deserialize)]
struct QuerySample {
    #[serde(default)]
    metric: HashMap<String, String>,
    value: (serde_json::Value, String),
}

impl PrometheusGateway {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            scope: config.scope.clone(),
            device_label: config.device_label.clone(),
            interface_label: config.interface_label.clone(),
            rx_counter: config.rx_counter.clone(),
            tx_counter: config.tx_counter.clone(),
        })
    }

    /// Bits-per-second rate of the direction's octet counter, aggregated over the window.
    /// A zero-length window is widened to one second.
    pub fn build_query(&self, metric: Metric, window: CaptureWindow) -> String {
        let counter = match metric.direction() {
            Direction::Rx => &self.rx_counter,
            Direction::Tx => &self.tx_counter,
        };
        let range = window.duration_secs().max(1);
        format!(
            "{}_over_time((rate({}{{{}}}[1m]) * 8)[{}s:])",
            metric.aggregation(),
            counter,
            self.scope,
            range
        )
    }

    fn parse_response(&self, body: &str) -> Result<Vec<GatewayRow>> {
        let response: QueryResponse = serde_json::from_str(body)
            .map_err(|e| ConductorError::Gateway(format!("invalid query response: {}", e)))?;
        if response.status != "success" {
            return Err(ConductorError::Gateway(format!(
                "query failed: {}",
                response.error.unwrap_or(response.status)
            )));
        }
        let samples = response.data.map(|d| d.result).unwrap_or_default();
        Ok(samples
            .into_iter()
            .map(|mut s| GatewayRow {
                device: s.metric.remove(&self.device_label),
                interface: s.metric.remove(&self.interface_label),
                value: s.value.1,
            })
            .collect())
    }
}

#[async_trait]
impl MetricsGateway for PrometheusGateway {
    #[instrument(skip(self, metric), fields(gateway = "prometheus", metric = metric.name()))]
    async fn query_metric(&self, metric: Metric, window: CaptureWindow) -> Result<Vec<GatewayRow>> {
        let query = self.build_query(metric, window);
        let time = window.end.to_string();
        debug!(%query, %time, "querying metrics backend");
        let response = self
            .client
            .get(format!("{}/api/v1/query", self.base_url))
            .query(&[("query", query.as_str()), ("time", time.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "metrics query failed");
            return Err(ConductorError::Gateway(format!(
                "metrics backend returned {}: {}",
                status, body
            )));
        }
        self.parse_response(&body)
    }
}
