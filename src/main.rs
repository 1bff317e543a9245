use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use nft_metrics_updater::config::ServiceConfig;
use nft_metrics_updater::scheduler::Scheduler;
use nft_metrics_updater::{service, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cfg = ServiceConfig::from_env()?;
    let _log_guard = telemetry::init_tracing(cfg.log_dir.as_deref());

    info!("═══════════════════════════════════════════════════");
    info!("  DeFi Performance NFT | metadata updater");
    info!("═══════════════════════════════════════════════════");

    let updater = Arc::new(service::build_updater(&cfg)?);
    let scheduler = Scheduler::new(updater, cfg.update_interval);
    scheduler.start();

    shutdown_signal().await;

    // no new cycle after this point; the in-flight one gets a grace period
    scheduler.stop();
    if !scheduler.drain(cfg.shutdown_grace).await {
        warn!(
            "Cycle still running after {:?}, exiting anyway",
            cfg.shutdown_grace
        );
    }
    info!("👋 Metadata updater exited");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, stopping scheduler"),
        _ = terminate => info!("SIGTERM received, stopping scheduler"),
    }
}
