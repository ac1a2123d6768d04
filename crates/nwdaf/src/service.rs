//! Process wiring: shared state, background tickers, SBI server and shutdown

use anyhow::{Context, Result};
use nwdaf_lib::analytics::AnalyticsEngine;
use nwdaf_lib::config::{ControllerConfig, NwdafConfig};
use nwdaf_lib::context::{NfIdentity, NwdafContext};
use nwdaf_lib::health::Component;
use nwdaf_lib::sbi::{create_router, AppState};
use nwdaf_lib::steering::SteeringController;
use nwdaf_lib::{HealthRegistry, NwdafMetrics, StructuredLogger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Grace period for in-flight SBI requests after shutdown is signalled
const SERVER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Grace period for a background ticker to finish its current pass
const TICKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(config: NwdafConfig, controller_config: ControllerConfig) -> Result<()> {
    let metrics = NwdafMetrics::new();
    let health = HealthRegistry::new();
    health.register_all().await;

    let logger = StructuredLogger::new(config.configuration.nwdaf_name.clone());
    let context = Arc::new(NwdafContext::new(NfIdentity::from_config(&config)));
    info!(nf_id = %context.identity().nf_id, "NF instance identity assigned");

    let analytics = Arc::new(AnalyticsEngine::new(
        context.clone(),
        config.analytics_period(),
    ));
    let controller = Arc::new(
        SteeringController::from_config(controller_config, metrics.clone(), health.clone())
            .context("failed to build steering controller")?,
    );

    let state = Arc::new(AppState {
        context,
        analytics: analytics.clone(),
        controller: controller.clone(),
        health: health.clone(),
        metrics,
    });
    let app = create_router(state);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let sbi_addr = config.configuration.sbi.bind_addr();
    let listener = tokio::net::TcpListener::bind(&sbi_addr)
        .await
        .with_context(|| format!("failed to bind SBI server to {}", sbi_addr))?;
    info!(addr = %sbi_addr, "SBI server listening");

    let mut server_shutdown = shutdown_tx.subscribe();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await
    });
    health.set_healthy(Component::Sbi).await;

    let analytics_handle = tokio::spawn(analytics.run(shutdown_tx.subscribe()));
    let monitor_handle = controller.start(shutdown_tx.subscribe());

    health.set_ready(true).await;
    logger.log_startup(config.version(), &sbi_addr);

    let reason = wait_for_signal().await;
    logger.log_shutdown(reason);
    health.set_ready(false).await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SERVER_SHUTDOWN_TIMEOUT, &mut server).await {
        Ok(Ok(Ok(()))) => info!("SBI server stopped"),
        Ok(Ok(Err(e))) => error!(error = %e, "SBI server error"),
        Ok(Err(e)) => error!(error = %e, "SBI server task failed"),
        Err(_) => {
            warn!(
                timeout_secs = SERVER_SHUTDOWN_TIMEOUT.as_secs(),
                "SBI server did not stop in time, aborting"
            );
            server.abort();
        }
    }

    join_ticker("analytics", analytics_handle, TICKER_SHUTDOWN_TIMEOUT).await;
    if let Some(handle) = monitor_handle {
        join_ticker("steering monitor", handle, TICKER_SHUTDOWN_TIMEOUT).await;
    }

    info!("NWDAF stopped");
    Ok(())
}

/// Wait for a ticker to exit, aborting it once `timeout` elapses.
/// Returns false if the task was aborted.
async fn join_ticker(name: &str, mut handle: JoinHandle<()>, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(())) => {
            info!(task = name, "Background task stopped");
            true
        }
        Ok(Err(e)) => {
            error!(task = name, error = %e, "Background task failed");
            true
        }
        Err(_) => {
            warn!(
                task = name,
                timeout_secs = timeout.as_secs(),
                "Background task did not stop in time, aborting"
            );
            handle.abort();
            false
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
