//! Task Mode Entry Guards
//!
//! Defines the ordered preconditions a machine must satisfy before a task
//! mode switch is issued. The first unmet precondition wins.

use std::fmt;

use crate::status::{MachineStatus, TaskMode};

/// A condition checked before entering a task mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Every configured axis is homed
    AxesHomed,
    /// Interpreter is not running a program
    InterpreterIdle,
    /// Machine is not in e-stop
    NotInEstop,
    /// Machine power is enabled
    MachineEnabled,
}

impl Precondition {
    pub fn is_met(self, status: &MachineStatus) -> bool {
        match self {
            Precondition::AxesHomed => status.all_homed(),
            Precondition::InterpreterIdle => status.is_interp_idle(),
            Precondition::NotInEstop => !status.estop,
            Precondition::MachineEnabled => status.enabled,
        }
    }

    fn failure_reason(self) -> &'static str {
        match self {
            Precondition::AxesHomed => "Axes not homed",
            Precondition::InterpreterIdle => "Interpreter is running",
            Precondition::NotInEstop => "CNC in Estop state",
            Precondition::MachineEnabled => "CNC is disabled",
        }
    }
}

const MDI_ENTRY: &[Precondition] = &[
    Precondition::AxesHomed,
    Precondition::InterpreterIdle,
    Precondition::NotInEstop,
    Precondition::MachineEnabled,
];

const MANUAL_ENTRY: &[Precondition] = &[
    Precondition::InterpreterIdle,
    Precondition::NotInEstop,
    Precondition::MachineEnabled,
];

/// Ordered preconditions for entering `mode`. Auto mode is not guarded.
pub fn preconditions_for(mode: TaskMode) -> &'static [Precondition] {
    match mode {
        TaskMode::Mdi => MDI_ENTRY,
        TaskMode::Manual => MANUAL_ENTRY,
        TaskMode::Auto | TaskMode::Unknown => &[],
    }
}

/// A refused mode switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardViolation {
    pub mode: TaskMode,
    pub unmet: Precondition,
}

impl fmt::Display for GuardViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot enter {} mode: {}",
            self.mode.display_name(),
            self.unmet.failure_reason()
        )
    }
}

impl std::error::Error for GuardViolation {}

/// Check every precondition for `mode` in order, stopping at the first failure
pub fn check_mode_entry(status: &MachineStatus, mode: TaskMode) -> Result<(), GuardViolation> {
    match preconditions_for(mode)
        .iter()
        .find(|p| !p.is_met(status))
    {
        Some(&unmet) => Err(GuardViolation { mode, unmet }),
        None => Ok(()),
    }
}
