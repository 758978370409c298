mod background;
mod config;
mod constants;
mod handlers;
mod models;
mod server;
mod state;
mod upstream;
mod util;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use rustls::crypto::ring::default_provider;
use rustls::crypto::CryptoProvider;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::background::run_refresh_poller;
use crate::config::Config;
use crate::server::build_router;
use crate::state::AppState;
use crate::upstream::UpstreamClient;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "datatable_sync=info".into()),
        )
        .init();

    CryptoProvider::install_default(default_provider())
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let config = Config::from_env()?;
    let upstream = UpstreamClient::new(
        config.upstream_url.clone(),
        config.upstream_cookie.clone(),
        config.request_timeout,
    )?;
    let state = AppState::new(config.clone(), upstream);

    if config.disable_background {
        warn!("background refresh disabled via DISABLE_BACKGROUND_TASKS");
    } else {
        tokio::spawn(run_refresh_poller(Arc::clone(&state)));
    }

    let app = build_router(Arc::clone(&state), config.static_dir.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        upstream = %config.upstream_url,
        refresh_ms = config.refresh_interval.as_millis(),
        "datatable-sync listening on {}",
        addr
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(Arc::clone(&state)))
    .await
    .context("server error")?;

    Ok(())
}

async fn shutdown_signal(state: Arc<AppState>) {
    #[cfg(unix)]
    {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(err) => {
                warn!(?err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutting down; closing table streams");
    state.broadcast_shutdown();
}
