use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub metrics: MetricsConfig,
    pub usecase: UsecaseConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

/// Metrics backend (Prometheus-compatible instant query API).
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Label matcher limiting the monitored targets, e.g. `job="snmp"`.
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_device_label")]
    pub device_label: String,
    #[serde(default = "default_interface_label")]
    pub interface_label: String,
    #[serde(default = "default_rx_counter")]
    pub rx_counter: String,
    #[serde(default = "default_tx_counter")]
    pub tx_counter: String,
}

fn default_scope() -> String {
    "job=\"snmp\"".into()
}

fn default_device_label() -> String {
    "device".into()
}

fn default_interface_label() -> String {
    "ifName".into()
}

fn default_rx_counter() -> String {
    "ifHCInOctets".into()
}

fn default_tx_counter() -> String {
    "ifHCOutOctets".into()
}

/// Usecase-parameter service (supplies the traffic scale for scaled diffs).
#[derive(Debug, Clone, Deserialize)]
pub struct UsecaseConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    /// Upper bound for the metric capture that runs when an interval ends.
    #[serde(default = "default_capture_timeout_secs")]
    pub capture_timeout_secs: u64,
    /// Snapshot used as reference by the unscaled diff.
    #[serde(default = "default_baseline_snapshot")]
    pub baseline_snapshot: String,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            capture_timeout_secs: default_capture_timeout_secs(),
            baseline_snapshot: default_baseline_snapshot(),
        }
    }
}

fn default_capture_timeout_secs() -> u64 {
    30
}

fn default_baseline_snapshot() -> String {
    "original_asis".into()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            !self.metrics.base_url.is_empty(),
            "metrics.base_url must be non-empty"
        );
        anyhow::ensure!(
            self.metrics.timeout_secs > 0,
            "metrics.timeout_secs must be > 0, got {}",
            self.metrics.timeout_secs
        );
        anyhow::ensure!(
            !self.metrics.device_label.is_empty() && !self.metrics.interface_label.is_empty(),
            "metrics.device_label and metrics.interface_label must be non-empty"
        );
        anyhow::ensure!(
            !self.usecase.base_url.is_empty(),
            "usecase.base_url must be non-empty"
        );
        anyhow::ensure!(
            self.usecase.timeout_secs > 0,
            "usecase.timeout_secs must be > 0, got {}",
            self.usecase.timeout_secs
        );
        anyhow::ensure!(
            self.sampling.capture_timeout_secs > 0,
            "sampling.capture_timeout_secs must be > 0, got {}",
            self.sampling.capture_timeout_secs
        );
        anyhow::ensure!(
            !self.sampling.baseline_snapshot.is_empty(),
            "sampling.baseline_snapshot must be non-empty"
        );
        Ok(())
    }
}
