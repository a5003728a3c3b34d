//! Guarded task mode switching

use cnc_bridge_shared::mode_guard::check_mode_entry;
use cnc_bridge_shared::{codes, timing, CommandResult, Reply, TaskMode};
use serde::Deserialize;
use tracing::warn;

use super::fresh_status;
use crate::context::AppContext;
use crate::link::Action;

#[derive(Debug, Deserialize)]
pub struct SetTaskModeArgs {
    pub mode: TaskMode,
}

/// Switch task mode once every entry precondition holds on a fresh poll
pub async fn set_task_mode(ctx: &AppContext, args: SetTaskModeArgs) -> Reply {
    if args.mode == TaskMode::Unknown {
        return CommandResult::invalid_args("invalid task mode: unknown").into();
    }

    let status = match fresh_status(ctx).await {
        Ok(status) => status,
        Err(reply) => return reply,
    };

    if let Err(violation) = check_mode_entry(&status, args.mode) {
        warn!("[MODE] {}", violation);
        return CommandResult::new(codes::GUARD_REJECTED, violation.to_string()).into();
    }

    ctx.executor
        .execute(&Action::Mode(args.mode), timing::MODE_SWITCH_TIMEOUT)
        .await
        .into()
}
