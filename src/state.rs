use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use datatable_sync::{Page, RefreshGate};

use crate::config::Config;
use crate::constants::BROADCAST_BUFFER;
use crate::models::RefreshPayload;
use crate::upstream::UpstreamClient;

#[derive(Clone)]
pub(crate) enum StreamEvent {
    Refresh(RefreshPayload),
    Error(String),
    Shutdown,
}

pub(crate) struct AppState {
    pub(crate) sender: broadcast::Sender<StreamEvent>,
    pub(crate) page: RwLock<Page>,
    pub(crate) gate: RefreshGate,
    pub(crate) upstream: UpstreamClient,
    pub(crate) config: Config,
    last_refresh_ms: AtomicU64,
}

impl AppState {
    pub(crate) fn new(config: Config, upstream: UpstreamClient) -> Arc<Self> {
        let (sender, _) = broadcast::channel(BROADCAST_BUFFER);
        Arc::new(Self {
            sender,
            page: RwLock::new(Page::new(config.translations.clone())),
            gate: RefreshGate::new(),
            upstream,
            config,
            last_refresh_ms: AtomicU64::new(0),
        })
    }

    pub(crate) fn record_refresh(&self, ts_ms: u64) {
        self.last_refresh_ms.store(ts_ms, Ordering::SeqCst);
    }

    pub(crate) fn last_refresh_ms(&self) -> Option<u64> {
        match self.last_refresh_ms.load(Ordering::SeqCst) {
            0 => None,
            ts => Some(ts),
        }
    }

    pub(crate) fn broadcast_refresh(&self, payload: RefreshPayload) {
        let _ = self.sender.send(StreamEvent::Refresh(payload));
    }

    pub(crate) fn broadcast_error(&self, message: impl Into<String>) {
        let _ = self.sender.send(StreamEvent::Error(message.into()));
    }

    pub(crate) fn broadcast_shutdown(&self) {
        let _ = self.sender.send(StreamEvent::Shutdown);
    }
}
