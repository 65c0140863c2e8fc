use anyhow::Result;
use state_conductor::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let repo = Arc::new(
        store::SamplingRepo::connect(&app_config.database.path, app_config.database.max_pool_size)
            .await?,
    );
    repo.init().await?;

    let metrics_gateway = Arc::new(
        gateway::PrometheusGateway::new(&app_config.metrics)
            .map_err(|e| anyhow::anyhow!("metrics gateway: {}", e))?,
    );
    let usecase_params = Arc::new(
        gateway::HttpUsecaseParams::new(&app_config.usecase)
            .map_err(|e| anyhow::anyhow!("usecase client: {}", e))?,
    );

    let sampling_machine = Arc::new(sampling::SamplingMachine::new(
        repo.clone(),
        metrics_gateway,
        Duration::from_secs(app_config.sampling.capture_timeout_secs),
    ));
    let diff_engine = Arc::new(diff::DiffEngine::new(
        repo.clone(),
        usecase_params,
        app_config.sampling.baseline_snapshot.clone(),
    ));

    let app = routes::app(sampling_machine, diff_engine, repo);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        metrics_backend = %app_config.metrics.base_url,
        baseline_snapshot = %app_config.sampling.baseline_snapshot,
        "Listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Received shutdown signal");
}
