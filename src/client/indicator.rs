//! Cache Indicator
//!
//! Publishes a small "N items" badge state whenever the client cache
//! changes, for whatever UI is listening.

use std::sync::Arc;

use tokio::sync::watch;

use crate::cache::CacheSnapshot;

/// What the badge should show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndicatorState {
    /// Shown only while the cache holds live entries
    pub visible: bool,
    pub label: String,
    pub size: usize,
}

impl IndicatorState {
    pub fn from_snapshot(snapshot: &CacheSnapshot) -> Self {
        Self {
            visible: snapshot.size > 0,
            label: format!("{} items", snapshot.size),
            size: snapshot.size,
        }
    }
}

/// Sender side of the badge. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CacheIndicator {
    tx: Arc<watch::Sender<IndicatorState>>,
}

impl CacheIndicator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(IndicatorState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Publishes the state for `snapshot`. Works with no receivers.
    pub fn update(&self, snapshot: &CacheSnapshot) {
        self.tx.send_replace(IndicatorState::from_snapshot(snapshot));
    }

    pub fn subscribe(&self) -> watch::Receiver<IndicatorState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> IndicatorState {
        self.tx.borrow().clone()
    }
}

impl Default for CacheIndicator {
    fn default() -> Self {
        Self::new()
    }
}
