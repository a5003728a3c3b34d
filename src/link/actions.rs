//! Controller Actions
//!
//! The closed set of actions the bridge issues to the controller, and the
//! completion codes the controller reports back for them.

use cnc_bridge_shared::{TaskMode, TaskState};
use std::fmt;
use std::path::PathBuf;

/// Jog sub-commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Jog {
    Stop { axis: u32 },
    Continuous { axis: u32, velocity: f64 },
    Increment { axis: u32, velocity: f64, distance: f64 },
}

/// Program (auto mode) sub-commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoCommand {
    /// Run the opened program starting at `line`
    Run { line: i32 },
    Step,
    Pause,
    Resume,
}

/// One action understood by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    State(TaskState),
    Mode(TaskMode),
    Home(u32),
    Jog(Jog),
    Mdi(String),
    Auto(AutoCommand),
    ProgramOpen(PathBuf),
    Abort,
    ResetInterpreter,
    LoadToolTable,
}

impl Action {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::State(_) => "state",
            Action::Mode(_) => "mode",
            Action::Home(_) => "home",
            Action::Jog(_) => "jog",
            Action::Mdi(_) => "mdi",
            Action::Auto(_) => "auto",
            Action::ProgramOpen(_) => "program_open",
            Action::Abort => "abort",
            Action::ResetInterpreter => "reset_interpreter",
            Action::LoadToolTable => "load_tool_table",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::State(state) => write!(f, "state({:?})", state),
            Action::Mode(mode) => write!(f, "mode({})", mode.as_str()),
            Action::Home(axis) => write!(f, "home({})", axis),
            Action::Jog(jog) => write!(f, "jog({:?})", jog),
            Action::Mdi(cmd) => write!(f, "mdi({})", cmd),
            Action::Auto(cmd) => write!(f, "auto({:?})", cmd),
            Action::ProgramOpen(path) => write!(f, "program_open({})", path.display()),
            other => f.write_str(other.name()),
        }
    }
}

/// Completion state reported by the controller for an issued action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Accepted, no completion observed yet
    Started,
    Done,
    Executing,
    Error,
}

/// Identifies an issued action when waiting for its completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandHandle(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        assert_eq!(Action::Mode(TaskMode::Mdi).to_string(), "mode(mdi)");
        assert_eq!(Action::Home(2).to_string(), "home(2)");
        assert_eq!(Action::Abort.to_string(), "abort");
        assert_eq!(
            Action::ProgramOpen(PathBuf::from("/tmp/a.ngc")).to_string(),
            "program_open(/tmp/a.ngc)"
        );
    }
}
