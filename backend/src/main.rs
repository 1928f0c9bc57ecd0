use anyhow::Result;
use chrono::Utc;
use finance_tracker_backend::{initialize_backend, AppConfig};
use log::{error, info, warn};
use std::time::Duration;
use tokio::sync::watch;

const DEFAULT_CONFIG_PATH: &str = "finance-tracker.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load(&config_path)?;
    let interval = Duration::from_secs(config.usage_reset.check_interval_secs.max(1));

    let state = initialize_backend(config)?;
    let follower = state.workspace.clone().follow_session(state.sessions.watch());

    match state.sessions.restore() {
        Some(session) => info!("Restored session for {}", session.user_id),
        None => warn!("No session to restore; collections stay empty until sign-in"),
    }

    let mut notices = state.notices.subscribe();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            info!("[{:?}] {}: {}", notice.level, notice.title, notice.message);
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = {
        let usage_reset = state.usage_reset.clone();
        tokio::spawn(async move { usage_reset.run(interval, shutdown_rx).await })
    };

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let raised = state.low_balance.check_workspace(&state.workspace, Utc::now());
                if !raised.is_empty() {
                    info!("Raised {} low-balance alerts", raised.len());
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down");
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        warn!("Usage reset task ended abnormally: {}", e);
    }
    follower.abort();
    state.workspace.close().await;
    Ok(())
}
