//! Controller Link Module
//!
//! The narrow interface through which the bridge talks to the external
//! controller process: status polling, the error channel and command issue.
//! A simulated controller is provided for development and tests.

mod actions;
mod simulator;

pub use actions::{Action, AutoCommand, CommandHandle, Completion, Jog};
pub use simulator::SimulatedMachine;

use anyhow::Result;
use async_trait::async_trait;
use cnc_bridge_shared::{ErrorKind, MachineStatus};
use std::time::Duration;

/// One message drained from the controller's error channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub kind: ErrorKind,
    pub text: String,
}

/// Handle on the controller's error channel
#[async_trait]
pub trait ErrorChannel: Send {
    /// Take at most one pending message
    async fn poll(&mut self) -> Result<Option<ChannelMessage>>;
}

/// Connection to the controller process
#[async_trait]
pub trait ControlLink: Send + Sync {
    /// Read a full status snapshot. Fails while the controller is down.
    async fn poll_status(&self) -> Result<MachineStatus>;

    /// Open a fresh error channel handle
    async fn open_error_channel(&self) -> Result<Box<dyn ErrorChannel>>;

    /// Issue an action without waiting for it
    async fn issue(&self, action: &Action) -> Result<CommandHandle>;

    /// Wait up to `timeout` for the action behind `handle` to settle.
    /// A zero timeout reads the current completion state without waiting.
    async fn wait_complete(&self, handle: CommandHandle, timeout: Duration) -> Result<Completion>;

    /// Start the controller process
    async fn launch(&self) -> Result<()>;

    /// Ask the controller process to exit
    async fn shutdown(&self) -> Result<()>;

    /// Human readable name for logs
    fn name(&self) -> &str;
}
