use std::io;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::telegram::TelegramRuntime;

pub async fn run_from_default_config() -> Result<()> {
    init_tracing();
    let config = AppConfig::load_default()?;
    run(config).await
}

/// Runs the listener until Ctrl-C or SIGTERM.
pub async fn run(config: AppConfig) -> Result<()> {
    let runtime = TelegramRuntime::from_app_config(&config)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    tracing::info!("starting web app bot");
    runtime.run(shutdown).await;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    wait_for_signal().await;
    shutdown.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!("failed to install SIGTERM handler: {err}");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

/// Resolves on Ctrl-C. If the handler cannot be installed this never
/// resolves, so the listener keeps running instead of stopping at once.
async fn wait_for_ctrl_c() {
    settle_ctrl_c(tokio::signal::ctrl_c()).await;
}

async fn settle_ctrl_c(signal: impl Future<Output = io::Result<()>>) {
    if let Err(err) = signal.await {
        tracing::warn!("failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}
