use std::sync::Arc;

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::models::RefreshPayload;
use crate::state::AppState;
use crate::util::now_ms;

pub(crate) async fn run_refresh_poller(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(state.config.refresh_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        match refresh_once(&state).await {
            Ok(Some(payload)) => {
                if payload.has_changes() {
                    state.broadcast_refresh(payload);
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(?err, "upstream refresh failed; keeping last-known tables");
                state.broadcast_error(format!("{:#}", err));
            }
        }
    }
}

/// One fetch-and-merge pass. Returns `None` when another pass was still in
/// flight. The registry lock is not held while the upstream is fetched.
pub(crate) async fn refresh_once(state: &AppState) -> Result<Option<RefreshPayload>> {
    let _pass = match state.gate.try_begin(false) {
        Some(pass) => pass,
        None => {
            debug!(dropped = state.gate.dropped_ticks(), "refresh still in flight");
            return Ok(None);
        }
    };

    let ticket = state.page.read().await.ticket();
    let html = state.upstream.fetch_page().await?;
    let ts = now_ms();

    let mut page = state.page.write().await;
    let payload = if page.is_empty() {
        let mounted = page.mount(&html);
        info!(tables = mounted.len(), upstream = %state.upstream.url(), "mirrored tables mounted");
        RefreshPayload {
            mounted,
            results: Vec::new(),
            ts,
        }
    } else {
        let results = page.refresh(&html, &ticket, &|| false);
        RefreshPayload {
            mounted: Vec::new(),
            results,
            ts,
        }
    };
    drop(page);

    state.record_refresh(ts);
    Ok(Some(payload))
}
