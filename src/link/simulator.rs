//! Simulated Controller
//!
//! An in-process stand-in for the controller. It keeps a machine status that
//! reacts to issued actions, queues error messages and records every action it
//! receives, which makes it the controller double for tests as well.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use cnc_bridge_shared::{ErrorKind, InterpState, MachineStatus, TaskMode, TaskState};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{Action, AutoCommand, ChannelMessage, CommandHandle, Completion, ControlLink, ErrorChannel};

#[derive(Debug, Default)]
struct SimState {
    running: bool,
    fail_launch: bool,
    status: MachineStatus,
    errors: VecDeque<ChannelMessage>,
    issued: Vec<Action>,
    /// Completions handed out before falling back to the simulated outcome
    scripted: VecDeque<Completion>,
    completions: HashMap<u64, Completion>,
    next_handle: u64,
}

impl SimState {
    /// Apply an action to the machine and report how it completed
    fn apply(&mut self, action: &Action) -> Completion {
        let status = &mut self.status;
        match action {
            Action::State(TaskState::On) if status.estop => return Completion::Error,
            Action::State(state) => {
                status.task_state = *state;
                match state {
                    TaskState::Estop => {
                        status.estop = true;
                        status.enabled = false;
                    }
                    TaskState::EstopReset | TaskState::Off => {
                        status.estop = false;
                        status.enabled = false;
                    }
                    TaskState::On => status.enabled = true,
                }
            }
            Action::Mode(mode) => status.task_mode = *mode,
            Action::Home(axis) => match status.homed.get_mut(*axis as usize) {
                Some(homed) => *homed = true,
                None => return Completion::Error,
            },
            Action::Jog(_) | Action::LoadToolTable => {}
            Action::Mdi(cmd) => status.command = cmd.clone(),
            Action::Auto(cmd) => {
                status.interp_state = match cmd {
                    AutoCommand::Run { line } => {
                        status.current_line = *line;
                        InterpState::Reading
                    }
                    AutoCommand::Step | AutoCommand::Pause => InterpState::Paused,
                    AutoCommand::Resume => InterpState::Reading,
                };
            }
            Action::ProgramOpen(path) => status.file = path.display().to_string(),
            Action::Abort | Action::ResetInterpreter => status.interp_state = InterpState::Idle,
        }
        Completion::Done
    }
}

/// Simulated controller process
#[derive(Clone)]
pub struct SimulatedMachine {
    name: String,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedMachine {
    /// A stopped machine with `axes` unhomed axes, sitting in e-stop
    pub fn new(name: impl Into<String>, axes: usize) -> Self {
        let status = MachineStatus {
            task_state: TaskState::Estop,
            task_mode: TaskMode::Manual,
            estop: true,
            homed: vec![false; axes],
            interp_state: InterpState::Idle,
            ..Default::default()
        };

        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(SimState {
                status,
                ..Default::default()
            })),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn set_running(&self, running: bool) {
        self.state.lock().running = running;
    }

    /// Make the next `launch` fail
    pub fn set_fail_launch(&self, fail: bool) {
        self.state.lock().fail_launch = fail;
    }

    /// Queue a message on the error channel
    pub fn push_error(&self, kind: ErrorKind, text: impl Into<String>) {
        self.state.lock().errors.push_back(ChannelMessage {
            kind,
            text: text.into(),
        });
    }

    /// Force the completion reported for the next issued action
    pub fn script_completion(&self, completion: Completion) {
        self.state.lock().scripted.push_back(completion);
    }

    /// Every action issued so far, oldest first
    pub fn issued(&self) -> Vec<Action> {
        self.state.lock().issued.clone()
    }

    pub fn clear_issued(&self) {
        self.state.lock().issued.clear();
    }

    pub fn status(&self) -> MachineStatus {
        self.state.lock().status.clone()
    }

    /// Issued actions whose completion has not been collected yet
    pub fn pending_completions(&self) -> usize {
        self.state.lock().completions.len()
    }

    /// Modify the simulated status in place
    pub fn update_status(&self, f: impl FnOnce(&mut MachineStatus)) {
        f(&mut self.state.lock().status);
    }
}

#[async_trait]
impl ControlLink for SimulatedMachine {
    async fn poll_status(&self) -> Result<MachineStatus> {
        let state = self.state.lock();
        if !state.running {
            bail!("{} is not running", self.name);
        }
        Ok(state.status.clone())
    }

    async fn open_error_channel(&self) -> Result<Box<dyn ErrorChannel>> {
        if !self.is_running() {
            bail!("cannot open error channel: {} is not running", self.name);
        }
        Ok(Box::new(SimErrorChannel {
            state: self.state.clone(),
        }))
    }

    async fn issue(&self, action: &Action) -> Result<CommandHandle> {
        let mut state = self.state.lock();
        if !state.running {
            bail!("{} is not running", self.name);
        }

        state.issued.push(action.clone());
        let scripted = state.scripted.pop_front();
        let completion = match scripted {
            Some(completion) => completion,
            None => state.apply(action),
        };

        state.next_handle += 1;
        let handle = CommandHandle(state.next_handle);
        state.completions.insert(handle.0, completion);
        debug!("[SIM] {} -> {:?}", action, completion);

        Ok(handle)
    }

    async fn wait_complete(&self, handle: CommandHandle, timeout: Duration) -> Result<Completion> {
        let completion = {
            let mut state = self.state.lock();
            let completion = state
                .completions
                .get(&handle.0)
                .copied()
                .ok_or_else(|| anyhow!("unknown command handle {}", handle.0))?;
            if matches!(completion, Completion::Done | Completion::Error) {
                state.completions.remove(&handle.0);
            }
            completion
        };

        match completion {
            Completion::Started | Completion::Executing if !timeout.is_zero() => {
                tokio::time::sleep(timeout).await;
                Ok(completion)
            }
            _ => Ok(completion),
        }
    }

    async fn launch(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_launch {
            bail!("failed to launch {}", self.name);
        }
        state.running = true;
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.state.lock().running = false;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct SimErrorChannel {
    state: Arc<Mutex<SimState>>,
}

#[async_trait]
impl ErrorChannel for SimErrorChannel {
    async fn poll(&mut self) -> Result<Option<ChannelMessage>> {
        let mut state = self.state.lock();
        if !state.running {
            bail!("error channel closed");
        }
        Ok(state.errors.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stopped_machine_refuses_everything() {
        let sim = SimulatedMachine::new("sim", 3);
        assert!(sim.poll_status().await.is_err());
        assert!(sim.open_error_channel().await.is_err());
        assert!(sim.issue(&Action::Abort).await.is_err());
        assert!(sim.issued().is_empty());
    }

    #[tokio::test]
    async fn test_actions_change_status() {
        let sim = SimulatedMachine::new("sim", 2);
        sim.launch().await.unwrap();

        sim.issue(&Action::State(TaskState::EstopReset)).await.unwrap();
        sim.issue(&Action::State(TaskState::On)).await.unwrap();
        sim.issue(&Action::Home(1)).await.unwrap();
        sim.issue(&Action::Mode(TaskMode::Mdi)).await.unwrap();

        let status = sim.poll_status().await.unwrap();
        assert!(!status.estop);
        assert!(status.enabled);
        assert_eq!(status.homed, vec![false, true]);
        assert_eq!(status.task_mode, TaskMode::Mdi);
        assert_eq!(sim.issued().len(), 4);
    }

    #[tokio::test]
    async fn test_power_on_in_estop_fails() {
        let sim = SimulatedMachine::new("sim", 1);
        sim.launch().await.unwrap();

        let handle = sim.issue(&Action::State(TaskState::On)).await.unwrap();
        let completion = sim.wait_complete(handle, Duration::ZERO).await.unwrap();
        assert_eq!(completion, Completion::Error);
        assert!(!sim.status().enabled);
    }

    #[tokio::test]
    async fn test_home_unknown_axis_fails() {
        let sim = SimulatedMachine::new("sim", 1);
        sim.launch().await.unwrap();

        let handle = sim.issue(&Action::Home(5)).await.unwrap();
        assert_eq!(
            sim.wait_complete(handle, Duration::ZERO).await.unwrap(),
            Completion::Error
        );
    }

    #[tokio::test]
    async fn test_error_channel_drains_in_order() {
        let sim = SimulatedMachine::new("sim", 1);
        sim.launch().await.unwrap();
        sim.push_error(ErrorKind::NmlError, "first");
        sim.push_error(ErrorKind::OperatorText, "second");

        let mut channel = sim.open_error_channel().await.unwrap();
        assert_eq!(channel.poll().await.unwrap().unwrap().text, "first");
        assert_eq!(channel.poll().await.unwrap().unwrap().text, "second");
        assert!(channel.poll().await.unwrap().is_none());

        sim.shutdown().await.unwrap();
        assert!(channel.poll().await.is_err());
    }

    #[tokio::test]
    async fn test_settled_completions_are_released() {
        let sim = SimulatedMachine::new("sim", 1);
        sim.launch().await.unwrap();

        for _ in 0..10 {
            let handle = sim.issue(&Action::Abort).await.unwrap();
            sim.wait_complete(handle, Duration::ZERO).await.unwrap();
        }
        assert_eq!(sim.pending_completions(), 0);

        sim.script_completion(Completion::Executing);
        let handle = sim.issue(&Action::Abort).await.unwrap();
        sim.wait_complete(handle, Duration::ZERO).await.unwrap();
        assert_eq!(sim.pending_completions(), 1);
        assert!(sim.wait_complete(handle, Duration::ZERO).await.is_ok());
    }
}
