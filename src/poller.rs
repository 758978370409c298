use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 10_000;

/// Keeps at most one refresh pass in flight. A tick that finds the gate
/// closed is dropped rather than queued; the next tick tries again.
#[derive(Debug, Default)]
pub struct RefreshGate {
    in_flight: AtomicBool,
    dropped: AtomicU64,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a pass unless one is already running or a confirmation dialog
    /// is on screen. The pass ends when the returned guard drops.
    pub fn try_begin(&self, confirm_visible: bool) -> Option<RefreshGuard<'_>> {
        if confirm_visible {
            debug!("confirmation visible; refresh tick dropped");
            self.dropped.fetch_add(1, Ordering::SeqCst);
            return None;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("refresh already in flight; tick dropped");
            self.dropped.fetch_add(1, Ordering::SeqCst);
            return None;
        }
        Some(RefreshGuard { gate: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Ticks skipped so far because a pass was running or a dialog was open.
    pub fn dropped_ticks(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }

    fn finish(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

#[must_use = "dropping the guard ends the refresh pass"]
#[derive(Debug)]
pub struct RefreshGuard<'a> {
    gate: &'a RefreshGate,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.gate.finish();
    }
}

/// Mount epochs of every table at the moment a fetch started. A table whose
/// epoch moved by merge time was unmounted (or remounted) in between and is
/// left alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshTicket {
    epochs: HashMap<String, u64>,
}

impl RefreshTicket {
    pub fn new(epochs: HashMap<String, u64>) -> Self {
        Self { epochs }
    }

    pub fn epoch(&self, table_id: &str) -> Option<u64> {
        self.epochs.get(table_id).copied()
    }

    pub fn table_ids(&self) -> impl Iterator<Item = &str> {
        self.epochs.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}
