//! Machine status snapshot and its wire representation

use serde::{Deserialize, Serialize};

/// Controller task state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Estop,
    EstopReset,
    Off,
    On,
}

/// Which command surface currently drives the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    #[default]
    Unknown,
    Manual,
    Auto,
    Mdi,
}

impl TaskMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskMode::Unknown => "unknown",
            TaskMode::Manual => "manual",
            TaskMode::Auto => "auto",
            TaskMode::Mdi => "mdi",
        }
    }

    /// Name used in operator-facing messages
    pub fn display_name(self) -> &'static str {
        match self {
            TaskMode::Unknown => "Unknown",
            TaskMode::Manual => "Manual",
            TaskMode::Auto => "Auto",
            TaskMode::Mdi => "MDI",
        }
    }
}

/// Program interpreter state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpState {
    #[default]
    Unknown,
    Idle,
    Reading,
    Paused,
    Waiting,
}

impl InterpState {
    pub fn as_str(self) -> &'static str {
        match self {
            InterpState::Unknown => "unknown",
            InterpState::Idle => "idle",
            InterpState::Reading => "reading",
            InterpState::Paused => "paused",
            InterpState::Waiting => "waiting",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One complete status poll. Replaced wholesale on every successful poll.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MachineStatus {
    pub position: Position,
    pub task_state: TaskState,
    pub task_mode: TaskMode,
    pub estop: bool,
    /// Machine power enabled
    pub enabled: bool,
    /// One flag per configured axis
    pub homed: Vec<bool>,
    pub current_line: i32,
    pub motion_line: i32,
    pub motion_mode: i32,
    pub motion_type: i32,
    pub read_line: i32,
    pub interp_state: InterpState,
    /// Currently opened program, empty when none
    pub file: String,
    /// Last MDI command
    pub command: String,
    pub tool_in_spindle: i32,
}

impl MachineStatus {
    /// True when every configured axis reports homed
    pub fn all_homed(&self) -> bool {
        self.homed.iter().all(|h| *h)
    }

    pub fn is_interp_idle(&self) -> bool {
        self.interp_state == InterpState::Idle
    }
}

/// Status wire schema sent to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub position: Position,
    pub estop: &'static str,
    pub task_state: &'static str,
    pub task_mode: &'static str,
    pub homed: Vec<bool>,
    pub current_line: i32,
    pub motion_line: i32,
    pub motion_mode: i32,
    pub motion_type: i32,
    pub read_line: i32,
    pub interp_state: &'static str,
    pub file: String,
    pub command: String,
    pub tool_in_spindle: i32,
}

impl From<&MachineStatus> for StatusReport {
    fn from(status: &MachineStatus) -> Self {
        let task_state = match status.task_state {
            TaskState::On => "on",
            TaskState::Off => "off",
            _ if status.estop => "estop",
            _ => "estop_reset",
        };

        Self {
            position: status.position,
            estop: if status.estop { "estop" } else { "estop reset" },
            task_state,
            task_mode: status.task_mode.as_str(),
            homed: status.homed.clone(),
            current_line: status.current_line,
            motion_line: status.motion_line,
            motion_mode: status.motion_mode,
            motion_type: status.motion_type,
            read_line: status.read_line,
            interp_state: status.interp_state.as_str(),
            file: status.file.clone(),
            command: status.command.clone(),
            tool_in_spindle: status.tool_in_spindle,
        }
    }
}
