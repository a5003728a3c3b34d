//! Command executor - issues one controller action and maps its completion

use cnc_bridge_shared::{codes, CommandResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::link::{Action, Completion, ControlLink};
use crate::poller::StatusCache;

/// Issues actions to the controller under the bridge's timeout policy.
///
/// A non-zero timeout waits for completion: done maps to OK, a controller
/// error to -2 and anything else (including expiry) to -1. A zero timeout is
/// fire-and-forget: only an immediate controller error fails the call.
pub struct CommandExecutor {
    link: Arc<dyn ControlLink>,
    cache: Arc<StatusCache>,
}

impl CommandExecutor {
    pub fn new(link: Arc<dyn ControlLink>, cache: Arc<StatusCache>) -> Self {
        Self { link, cache }
    }

    pub async fn execute(&self, action: &Action, timeout: Duration) -> CommandResult {
        if !self.cache.is_alive().await {
            return CommandResult::not_running();
        }

        debug!("[CMD] Issuing {} (timeout {:?})", action, timeout);

        let handle = match self.link.issue(action).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("[CMD] Failed to issue {}: {}", action, e);
                return CommandResult::new(codes::COMMAND_ERROR, e.to_string());
            }
        };

        let result = if timeout.is_zero() {
            match self.link.wait_complete(handle, Duration::ZERO).await {
                Ok(Completion::Error) | Err(_) => CommandResult::command_error(),
                Ok(_) => CommandResult::ok(),
            }
        } else {
            match tokio::time::timeout(timeout, self.link.wait_complete(handle, timeout)).await {
                Ok(Ok(Completion::Done)) => CommandResult::ok(),
                Ok(Ok(Completion::Error)) | Ok(Err(_)) => CommandResult::command_error(),
                Ok(Ok(_)) | Err(_) => CommandResult::timed_out(),
            }
        };

        if result.is_ok() {
            debug!("[CMD] {} completed", action);
        } else {
            warn!("[CMD] {} failed: {}", action, result.text);
        }
        result
    }
}
