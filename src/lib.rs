//! CNC Controller Bridge
//!
//! Keeps a cached view of an external CNC controller fresh, fans status and
//! controller messages out to observers, and runs named client commands
//! against the controller and its tool table file.
//!
//! A transport embeds the bridge through [`CommandDispatcher::handle_command`]
//! and the subscription methods on [`ObserverRegistry`].

pub mod command;
pub mod config;
pub mod context;
pub mod link;
pub mod observer;
pub mod poller;
pub mod tool_table;

pub use command::{CommandDispatcher, CommandExecutor, CommandKind};
pub use config::BridgeConfig;
pub use context::AppContext;
pub use link::{ControlLink, SimulatedMachine};
pub use observer::{Channel, ErrorObserver, ObserverRegistry, StatusObserver, SubscriptionId};
