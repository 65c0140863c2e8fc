// Shared test helpers: temp database, fake metrics gateway, fake usecase parameters

#![allow(dead_code)]

use async_trait::async_trait;
use state_conductor::error::{ConductorError, Result};
use state_conductor::gateway::{CaptureWindow, GatewayRow, MetricsGateway, UsecaseParams};
use state_conductor::models::Metric;
use state_conductor::store::SamplingRepo;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub async fn temp_repo() -> (TempDir, Arc<SamplingRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conductor.db");
    let repo = SamplingRepo::connect(path.to_str().unwrap(), 4)
        .await
        .unwrap();
    repo.init().await.unwrap();
    (dir, Arc::new(repo))
}

pub fn row(device: &str, interface: &str, value: &str) -> GatewayRow {
    GatewayRow {
        device: Some(device.to_string()),
        interface: Some(interface.to_string()),
        value: value.to_string(),
    }
}

/// Returns canned rows per metric; can be switched to fail or to stall.
#[derive(Default)]
pub struct FakeGateway {
    rows: Mutex<HashMap<Metric, Vec<GatewayRow>>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    windows: Mutex<Vec<CaptureWindow>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_rows(&self, metric: Metric, rows: Vec<GatewayRow>) {
        self.rows.lock().unwrap().insert(metric, rows);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Distinct windows queried so far, in call order.
    pub fn windows(&self) -> Vec<CaptureWindow> {
        let mut out = self.windows.lock().unwrap().clone();
        out.dedup();
        out
    }
}

#[async_trait]
impl MetricsGateway for FakeGateway {
    async fn query_metric(&self, metric: Metric, window: CaptureWindow) -> Result<Vec<GatewayRow>> {
        self.windows.lock().unwrap().push(window);
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ConductorError::Gateway("backend unavailable".into()));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&metric)
            .cloned()
            .unwrap_or_default())
    }
}

/// Traffic scale keyed by (usecase, network); unknown keys are missing the scale.
#[derive(Default)]
pub struct FakeUsecase {
    scales: Mutex<HashMap<(String, String), f64>>,
}

impl FakeUsecase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_scale(&self, usecase: &str, network: &str, scale: f64) {
        self.scales
            .lock()
            .unwrap()
            .insert((usecase.to_string(), network.to_string()), scale);
    }
}

#[async_trait]
impl UsecaseParams for FakeUsecase {
    async fn traffic_scale(&self, usecase: &str, network: &str) -> Result<f64> {
        self.scales
            .lock()
            .unwrap()
            .get(&(usecase.to_string(), network.to_string()))
            .copied()
            .ok_or_else(|| {
                ConductorError::Gateway(format!(
                    "usecase parameters for {}/{} missing a positive traffic_scale",
                    usecase, network
                ))
            })
    }
}
