use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::serve;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use banter_quota_tracker::api::{self, ApiState};
use banter_quota_tracker::config::QuotaTrackerConfig;
use banter_quota_tracker::storage::QuotaStore;
use banter_quota_tracker::tracker::QuotaTracker;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = QuotaTrackerConfig::from_env().context("failed to load configuration")?;

    info!(
        host = %config.server_host,
        port = config.server_port,
        data_dir = %config.data_dir.display(),
        daily_limit = config.daily_limit,
        "starting quota-tracker service"
    );

    let store = Arc::new(QuotaStore::new(config.data_dir.clone())?);
    let tracker = Arc::new(QuotaTracker::new(Arc::clone(&store), config.daily_limit));

    match tracker.tracked_users() {
        Ok(count) => info!(tracked_users = count, "loaded usage records from storage"),
        Err(err) => warn!(error = %err, "failed to count stored usage records"),
    }

    let state = Arc::new(ApiState::new(Arc::clone(&tracker)));
    let router = api::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("invalid server bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;
    let local_addr = listener
        .local_addr()
        .context("failed to read bound address")?;
    info!(%local_addr, "quota-tracker listening");

    serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server encountered an unrecoverable error")?;

    info!("quota-tracker shutdown complete");
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| std::env::var("LOG_LEVEL").map(EnvFilter::new))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
