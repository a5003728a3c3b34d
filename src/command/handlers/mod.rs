//! Command handlers for the different command families
//!
//! Each handler receives the application context and, where the command
//! takes arguments, an already validated argument struct.

mod machine;
mod mode;
mod motion;
mod program;
mod tools;

pub use machine::{current_state, ini_params, set_state, start_cnc, stop_cnc, SetStateArgs};
pub use mode::{set_task_mode, SetTaskModeArgs};
pub use motion::{
    home_all, home_axis, move_axis_continuous, move_axis_increment, move_axis_stop, run_mdi,
    AxisArgs, ContinuousJogArgs, IncrementJogArgs, MdiArgs,
};
pub use program::{
    gcode_content, load_gcode, pause_gcode, reset_interpreter, resume_gcode, run_gcode,
    step_gcode, stop_gcode, LoadGcodeArgs, RunGcodeArgs,
};
pub use tools::{
    add_tool, delete_tools, reload_tool_table, tools_data, update_tools, AddToolArgs,
    DeleteToolsArgs, UpdateToolsArgs,
};

use cnc_bridge_shared::{CommandResult, MachineStatus, Reply};
use std::sync::Arc;

use crate::context::AppContext;

/// Poll the controller now rather than trusting the cache
async fn fresh_status(ctx: &AppContext) -> Result<Arc<MachineStatus>, Reply> {
    ctx.status_poller
        .poll_status()
        .await
        .ok_or_else(|| CommandResult::not_running().into())
}
