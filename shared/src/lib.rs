//! CNC Bridge Shared Types
//!
//! This crate provides the wire types and file formats shared between the
//! controller bridge and whatever transport sits in front of it.

pub mod event;
pub mod ini;
pub mod machine;
pub mod mode_guard;
pub mod result;
pub mod status;
pub mod tool_table;

use std::time::Duration;

// Re-export commonly used types at crate root
pub use event::{ErrorEvent, ErrorKind, Severity};
pub use ini::{IniError, MachineIni};
pub use machine::{AxisInfo, MachineDescriptor};
pub use mode_guard::{GuardViolation, Precondition};
pub use result::{codes, CommandResult, Reply, ReplyBody};
pub use status::{InterpState, MachineStatus, Position, StatusReport, TaskMode, TaskState};
pub use tool_table::{ToolKey, ToolRecord};

/// Timing parameters for the bridge
pub mod timing {
    use super::Duration;

    /// Status poll period
    pub const STATUS_POLL_INTERVAL_MS: u64 = 100;

    /// Error channel poll period
    pub const ERROR_POLL_INTERVAL_MS: u64 = 25;

    /// Delay between liveness checks while waiting for a freshly launched controller
    pub const START_POLL_INTERVAL_MS: u64 = 300;

    /// Upper bound on waiting for a freshly launched controller
    pub const START_TIMEOUT_MS: u64 = 30_000;

    /// Machine state changes (on/off/estop)
    pub const STATE_TIMEOUT: Duration = Duration::from_secs(3);

    /// Guarded task mode switch requested by a client
    pub const MODE_SWITCH_TIMEOUT: Duration = Duration::from_secs(5);

    /// Mode switches performed as a side effect of program handling
    pub const PROGRAM_MODE_TIMEOUT: Duration = Duration::from_secs(3);

    /// Opening a staged program
    pub const PROGRAM_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

    /// Homing a single axis
    pub const HOME_TIMEOUT: Duration = Duration::from_secs(3);

    /// Fire-and-forget: issue and do not wait for completion
    pub const NO_WAIT: Duration = Duration::ZERO;
}
