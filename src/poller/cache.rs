//! Status Cache
//!
//! Latest successful status poll plus the controller liveness flag. Both live
//! under one lock so a reader never sees a cached status while the link is
//! marked down.

use cnc_bridge_shared::MachineStatus;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct CacheState {
    alive: bool,
    status: Option<Arc<MachineStatus>>,
}

/// Shared status cache; starts out not alive and empty
#[derive(Debug, Default)]
pub struct StatusCache {
    inner: RwLock<CacheState>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_alive(&self) -> bool {
        self.inner.read().await.alive
    }

    /// Latest status, only while the link is alive
    pub async fn snapshot(&self) -> Option<Arc<MachineStatus>> {
        let state = self.inner.read().await;
        if state.alive {
            state.status.clone()
        } else {
            None
        }
    }

    /// Store a fresh poll and mark alive. Returns true if the link just came up.
    pub async fn store(&self, status: Arc<MachineStatus>) -> bool {
        let mut state = self.inner.write().await;
        let came_up = !state.alive;
        state.alive = true;
        state.status = Some(status);
        came_up
    }

    /// Drop the cached status and mark down. Returns true if the link just went down.
    pub async fn mark_down(&self) -> bool {
        let mut state = self.inner.write().await;
        let went_down = state.alive;
        state.alive = false;
        state.status = None;
        went_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initially_down() {
        let cache = StatusCache::new();
        assert!(!cache.is_alive().await);
        assert!(cache.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_edges_reported_once() {
        let cache = StatusCache::new();
        let status = Arc::new(MachineStatus::default());

        assert!(cache.store(status.clone()).await);
        assert!(!cache.store(status.clone()).await);
        assert!(cache.snapshot().await.is_some());

        assert!(cache.mark_down().await);
        assert!(!cache.mark_down().await);
        assert!(cache.snapshot().await.is_none());
    }
}
