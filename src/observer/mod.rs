//! Observer Module
//!
//! Status and error consumers register here and are notified synchronously
//! from the polling tasks.

mod registry;

pub use registry::ObserverRegistry;

use cnc_bridge_shared::{ErrorEvent, MachineStatus};
use std::fmt;
use uuid::Uuid;

/// Handle returned by `subscribe_*`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Observer channel key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Status,
    Errors,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Status => "status",
            Channel::Errors => "errors",
        }
    }
}

/// Receives every successful status poll.
///
/// Called on the polling task, so implementations must return quickly.
/// Returning an error removes the observer from the registry.
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, status: &MachineStatus) -> anyhow::Result<()>;
}

/// Receives every message drained from the error channel.
///
/// Same delivery rules as [`StatusObserver`].
pub trait ErrorObserver: Send + Sync {
    fn on_error(&self, event: &ErrorEvent) -> anyhow::Result<()>;
}

impl<F> StatusObserver for F
where
    F: Fn(&MachineStatus) -> anyhow::Result<()> + Send + Sync,
{
    fn on_status(&self, status: &MachineStatus) -> anyhow::Result<()> {
        self(status)
    }
}

impl<F> ErrorObserver for F
where
    F: Fn(&ErrorEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_error(&self, event: &ErrorEvent) -> anyhow::Result<()> {
        self(event)
    }
}
