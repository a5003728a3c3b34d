//! Command dispatcher - routes named client commands to their handlers

use cnc_bridge_shared::{CommandResult, Reply};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::handlers;
use crate::context::AppContext;

/// Every command the bridge accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    StartCnc,
    StopCnc,
    CurrentState,
    SetState,
    SetTaskMode,
    HomeAxis,
    HomeAll,
    MoveAxisStop,
    MoveAxisContinuous,
    MoveAxisIncrement,
    IniParams,
    LoadGcode,
    RunGcode,
    StepGcode,
    PauseGcode,
    ResumeGcode,
    StopGcode,
    ResetInterpreter,
    GcodeContent,
    ToolsData,
    AddTool,
    DeleteTools,
    UpdateTools,
    ReloadToolTable,
    RunMdi,
}

impl CommandKind {
    pub const ALL: [CommandKind; 25] = [
        CommandKind::StartCnc,
        CommandKind::StopCnc,
        CommandKind::CurrentState,
        CommandKind::SetState,
        CommandKind::SetTaskMode,
        CommandKind::HomeAxis,
        CommandKind::HomeAll,
        CommandKind::MoveAxisStop,
        CommandKind::MoveAxisContinuous,
        CommandKind::MoveAxisIncrement,
        CommandKind::IniParams,
        CommandKind::LoadGcode,
        CommandKind::RunGcode,
        CommandKind::StepGcode,
        CommandKind::PauseGcode,
        CommandKind::ResumeGcode,
        CommandKind::StopGcode,
        CommandKind::ResetInterpreter,
        CommandKind::GcodeContent,
        CommandKind::ToolsData,
        CommandKind::AddTool,
        CommandKind::DeleteTools,
        CommandKind::UpdateTools,
        CommandKind::ReloadToolTable,
        CommandKind::RunMdi,
    ];

    /// Wire name of the command
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::StartCnc => "start_cnc",
            CommandKind::StopCnc => "stop_cnc",
            CommandKind::CurrentState => "current_state",
            CommandKind::SetState => "set_state",
            CommandKind::SetTaskMode => "set_task_mode",
            CommandKind::HomeAxis => "home_axis",
            CommandKind::HomeAll => "home_all",
            CommandKind::MoveAxisStop => "move_axis_stop",
            CommandKind::MoveAxisContinuous => "move_axis_continuous",
            CommandKind::MoveAxisIncrement => "move_axis_increment",
            CommandKind::IniParams => "ini_params",
            CommandKind::LoadGcode => "load_gcode",
            CommandKind::RunGcode => "run_gcode",
            CommandKind::StepGcode => "step_gcode",
            CommandKind::PauseGcode => "pause_gcode",
            CommandKind::ResumeGcode => "resume_gcode",
            CommandKind::StopGcode => "stop_gcode",
            CommandKind::ResetInterpreter => "reset_interpreter",
            CommandKind::GcodeContent => "gcode_content",
            CommandKind::ToolsData => "tools_data",
            CommandKind::AddTool => "add_tool",
            CommandKind::DeleteTools => "delete_tools",
            CommandKind::UpdateTools => "update_tools",
            CommandKind::ReloadToolTable => "reload_tool_table",
            CommandKind::RunMdi => "run_mdi",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether the command needs a live controller. Lifecycle and tool table
    /// file commands work while the controller is down.
    pub fn requires_link(self) -> bool {
        !matches!(
            self,
            CommandKind::StartCnc
                | CommandKind::StopCnc
                | CommandKind::ToolsData
                | CommandKind::AddTool
                | CommandKind::DeleteTools
                | CommandKind::UpdateTools
        )
    }
}

/// Deserialize a command's argument object. A missing object counts as empty.
fn parse_args<T: DeserializeOwned>(kind: CommandKind, args: Value) -> Result<T, Reply> {
    let args = match args {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    serde_json::from_value(args).map_err(|e| {
        warn!("[DISPATCH] Bad arguments for {}: {}", kind.name(), e);
        CommandResult::invalid_args(e.to_string()).into()
    })
}

/// Single entry point for client commands
pub struct CommandDispatcher {
    ctx: Arc<AppContext>,
}

impl CommandDispatcher {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Run the command `name` with its JSON argument object
    pub async fn handle_command(&self, name: &str, args: Value) -> Reply {
        let kind = match CommandKind::from_name(name) {
            Some(kind) => kind,
            None => {
                warn!("[DISPATCH] Unsupported command: {}", name);
                return CommandResult::unsupported().into();
            }
        };

        if kind.requires_link() && !self.ctx.cache.is_alive().await {
            debug!("[DISPATCH] {} refused, controller not running", name);
            return CommandResult::not_running().into();
        }

        debug!("[DISPATCH] {}", name);
        let ctx = self.ctx.as_ref();

        let reply = match kind {
            CommandKind::StartCnc => handlers::start_cnc(ctx).await,
            CommandKind::StopCnc => handlers::stop_cnc(ctx).await,
            CommandKind::CurrentState => handlers::current_state(ctx).await,
            CommandKind::SetState => match parse_args(kind, args) {
                Ok(args) => handlers::set_state(ctx, args).await,
                Err(reply) => reply,
            },
            CommandKind::SetTaskMode => match parse_args(kind, args) {
                Ok(args) => handlers::set_task_mode(ctx, args).await,
                Err(reply) => reply,
            },
            CommandKind::HomeAxis => match parse_args(kind, args) {
                Ok(args) => handlers::home_axis(ctx, args).await,
                Err(reply) => reply,
            },
            CommandKind::HomeAll => handlers::home_all(ctx).await,
            CommandKind::MoveAxisStop => match parse_args(kind, args) {
                Ok(args) => handlers::move_axis_stop(ctx, args).await,
                Err(reply) => reply,
            },
            CommandKind::MoveAxisContinuous => match parse_args(kind, args) {
                Ok(args) => handlers::move_axis_continuous(ctx, args).await,
                Err(reply) => reply,
            },
            CommandKind::MoveAxisIncrement => match parse_args(kind, args) {
                Ok(args) => handlers::move_axis_increment(ctx, args).await,
                Err(reply) => reply,
            },
            CommandKind::IniParams => handlers::ini_params(ctx),
            CommandKind::LoadGcode => match parse_args(kind, args) {
                Ok(args) => handlers::load_gcode(ctx, args).await,
                Err(reply) => reply,
            },
            CommandKind::RunGcode => match parse_args(kind, args) {
                Ok(args) => handlers::run_gcode(ctx, args).await,
                Err(reply) => reply,
            },
            CommandKind::StepGcode => handlers::step_gcode(ctx).await,
            CommandKind::PauseGcode => handlers::pause_gcode(ctx).await,
            CommandKind::ResumeGcode => handlers::resume_gcode(ctx).await,
            CommandKind::StopGcode => handlers::stop_gcode(ctx).await,
            CommandKind::ResetInterpreter => handlers::reset_interpreter(ctx).await,
            CommandKind::GcodeContent => handlers::gcode_content(ctx).await,
            CommandKind::ToolsData => handlers::tools_data(ctx).await,
            CommandKind::AddTool => match parse_args(kind, args) {
                Ok(args) => handlers::add_tool(ctx, args).await,
                Err(reply) => reply,
            },
            CommandKind::DeleteTools => match parse_args(kind, args) {
                Ok(args) => handlers::delete_tools(ctx, args).await,
                Err(reply) => reply,
            },
            CommandKind::UpdateTools => match parse_args(kind, args) {
                Ok(args) => handlers::update_tools(ctx, args).await,
                Err(reply) => reply,
            },
            CommandKind::ReloadToolTable => handlers::reload_tool_table(ctx).await,
            CommandKind::RunMdi => match parse_args(kind, args) {
                Ok(args) => handlers::run_mdi(ctx, args).await,
                Err(reply) => reply,
            },
        };

        debug!(
            "[DISPATCH] {} -> {} ({})",
            name,
            reply.result.code,
            reply.result.text
        );
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::handlers::test_support::{fixture, make_ready, running_fixture};
    use crate::link::{Action, SimulatedMachine};
    use cnc_bridge_shared::{MachineIni, TaskMode};
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn test_command_table_is_complete() {
        let names: HashSet<_> = CommandKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), CommandKind::ALL.len());

        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(CommandKind::from_name("tool_change"), None);
    }

    #[tokio::test]
    async fn test_unknown_command_always_unsupported() {
        let fx = fixture();
        let dispatcher = CommandDispatcher::new(fx.ctx.clone());
        let reply = dispatcher.handle_command("nope", json!({})).await;
        assert_eq!(reply.code(), -3);
        assert_eq!(reply.result.text, "unsupported command");

        fx.sim.set_running(true);
        fx.ctx.status_poller.poll_status().await;
        let reply = dispatcher.handle_command("nope", Value::Null).await;
        assert_eq!(reply.code(), -3);
    }

    #[tokio::test]
    async fn test_liveness_guard() {
        let fx = fixture();
        let dispatcher = CommandDispatcher::new(fx.ctx.clone());

        for name in ["current_state", "home_all", "run_mdi", "ini_params", "step_gcode"] {
            let reply = dispatcher.handle_command(name, json!({"command": "G0"})).await;
            assert_eq!(reply.code(), -2, "{} should need the controller", name);
            assert_eq!(reply.result.text, "not running");
        }

        // Tool table commands only need the file
        let reply = dispatcher.handle_command("tools_data", Value::Null).await;
        assert_eq!(reply.code(), 0);
    }

    #[tokio::test]
    async fn test_bad_arguments_are_code_minus_one() {
        let fx = running_fixture().await;
        let dispatcher = CommandDispatcher::new(fx.ctx.clone());

        let reply = dispatcher.handle_command("home_axis", json!({})).await;
        assert_eq!(reply.code(), -1);
        assert!(reply.result.text.contains("axis_number"));

        let reply = dispatcher
            .handle_command("set_state", json!({"state": "flying"}))
            .await;
        assert_eq!(reply.code(), -1);

        let reply = dispatcher.handle_command("delete_tools", json!({"tools": "all"})).await;
        assert_eq!(reply.code(), -1);
        assert!(fx.sim.issued().is_empty());
    }

    #[tokio::test]
    async fn test_set_task_mode_guard_end_to_end() {
        let fx = running_fixture().await;
        let dispatcher = CommandDispatcher::new(fx.ctx.clone());

        let reply = dispatcher
            .handle_command("set_task_mode", json!({"mode": "mdi"}))
            .await;
        assert_eq!(reply.code(), -2);
        assert!(reply.result.text.contains("Axes not homed"));
        assert!(fx.sim.issued().is_empty());

        make_ready(&fx.sim);
        let reply = dispatcher
            .handle_command("set_task_mode", json!({"mode": "mdi"}))
            .await;
        assert_eq!(reply.code(), 0);
        assert_eq!(fx.sim.issued(), vec![Action::Mode(TaskMode::Mdi)]);
    }

    #[tokio::test]
    async fn test_add_tool_twice() {
        let fx = fixture();
        let dispatcher = CommandDispatcher::new(fx.ctx.clone());
        let args = json!({"tool": {"T": 5, "P": "10", ";": "Note"}});

        assert_eq!(dispatcher.handle_command("add_tool", args.clone()).await.code(), 0);
        let table = fx.dir.path().join("tool.tbl");
        let before = std::fs::read(&table).unwrap();

        assert_eq!(dispatcher.handle_command("add_tool", args).await.code(), 1);
        assert_eq!(std::fs::read(&table).unwrap(), before);

        let json = dispatcher.handle_command("tools_data", Value::Null).await.to_json();
        let tools = json["tools"].as_array().unwrap();
        assert_eq!(tools.last().unwrap()[";"], "note");
    }

    #[tokio::test]
    async fn test_run_gcode_defaults_to_first_line() {
        let fx = running_fixture().await;
        let dispatcher = CommandDispatcher::new(fx.ctx.clone());
        let reply = dispatcher.handle_command("run_gcode", Value::Null).await;
        assert_eq!(reply.code(), 0);
        assert_eq!(fx.sim.status().current_line, 0);
    }

    #[tokio::test]
    async fn test_home_all_without_axes_succeeds() {
        let sim = SimulatedMachine::new("sim", 0);
        sim.set_running(true);
        let ctx = Arc::new(AppContext::new(
            Arc::new(sim.clone()),
            &MachineIni::parse("[EMC]\nMACHINE = bare\n"),
            std::env::temp_dir(),
            Duration::from_millis(100),
        ));
        ctx.status_poller.poll_status().await;

        let dispatcher = CommandDispatcher::new(ctx);
        let reply = dispatcher.handle_command("home_all", Value::Null).await;
        assert_eq!(reply.code(), 0);
        assert_eq!(sim.issued(), vec![Action::Mode(TaskMode::Manual)]);

        let reply = dispatcher.handle_command("ini_params", Value::Null).await;
        assert_eq!(reply.code(), -1);
        assert_eq!(reply.result.text, "no axis info found");

        let reply = dispatcher.handle_command("tools_data", Value::Null).await;
        assert_eq!(reply.result.text, "no tool table configured");
    }

    #[tokio::test]
    async fn test_start_then_status() {
        let fx = fixture();
        let dispatcher = CommandDispatcher::new(fx.ctx.clone());

        assert_eq!(dispatcher.handle_command("start_cnc", Value::Null).await.code(), 0);
        let json = dispatcher
            .handle_command("current_state", Value::Null)
            .await
            .to_json();
        assert_eq!(json["result"]["code"], 0);
        assert_eq!(json["estop"], "estop");
        assert_eq!(json["task_state"], "estop");
    }
}
