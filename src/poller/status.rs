//! Status Poller
//!
//! Refreshes the status cache from the controller and broadcasts each
//! successful poll to the status observers.

use cnc_bridge_shared::MachineStatus;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::StatusCache;
use crate::link::ControlLink;
use crate::observer::ObserverRegistry;

pub struct StatusPoller {
    link: Arc<dyn ControlLink>,
    cache: Arc<StatusCache>,
    observers: Arc<ObserverRegistry>,
    /// Serializes poll and cache update so an older poll never lands after a newer one
    in_flight: Mutex<()>,
}

impl StatusPoller {
    pub fn new(
        link: Arc<dyn ControlLink>,
        cache: Arc<StatusCache>,
        observers: Arc<ObserverRegistry>,
    ) -> Self {
        Self {
            link,
            cache,
            observers,
            in_flight: Mutex::new(()),
        }
    }

    /// Run one poll. Returns the new status, or `None` if the poll failed.
    pub async fn poll_status(&self) -> Option<Arc<MachineStatus>> {
        let _in_flight = self.in_flight.lock().await;
        match self.link.poll_status().await {
            Ok(status) => {
                let status = Arc::new(status);
                if self.cache.store(status.clone()).await {
                    info!("[POLL] {} is up", self.link.name());
                }
                self.observers.notify_status(&status);
                Some(status)
            }
            Err(e) => {
                if self.cache.mark_down().await {
                    error!("[POLL] {} is down: {}", self.link.name(), e);
                }
                None
            }
        }
    }
}
