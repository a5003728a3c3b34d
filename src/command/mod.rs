//! Command handling for the bridge
//!
//! This module handles:
//! - Mapping command names to handlers
//! - Validating command arguments
//! - Guarding controller commands on liveness and mode preconditions
//! - Issuing controller actions under the timeout policy

mod dispatcher;
mod executor;
pub mod handlers;

pub use dispatcher::{CommandDispatcher, CommandKind};
pub use executor::CommandExecutor;
