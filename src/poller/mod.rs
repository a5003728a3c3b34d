//! Polling Module
//!
//! Background tasks that keep the status cache fresh and drain the
//! controller error channel on fixed periods.

mod cache;
mod errors;
mod status;

pub use cache::StatusCache;
pub use errors::ErrorPoller;
pub use status::StatusPoller;

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

/// Handle to the running poll tasks
pub struct PollingHandle {
    status_task: JoinHandle<()>,
    error_task: JoinHandle<()>,
}

impl PollingHandle {
    /// Stop both poll tasks
    pub fn stop(self) {
        self.status_task.abort();
        self.error_task.abort();
        info!("[POLL] Polling stopped");
    }
}

/// Spawn the status and error poll loops
pub fn start_polling(
    status: Arc<StatusPoller>,
    errors: Arc<ErrorPoller>,
    status_interval: Duration,
    error_interval: Duration,
) -> PollingHandle {
    let status_task = tokio::spawn(async move {
        let mut ticker = interval(status_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            status.poll_status().await;
        }
    });

    let error_task = tokio::spawn(async move {
        let mut ticker = interval(error_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            errors.poll_errors().await;
        }
    });

    info!(
        "[POLL] Polling started (status every {:?}, errors every {:?})",
        status_interval, error_interval
    );

    PollingHandle {
        status_task,
        error_task,
    }
}
