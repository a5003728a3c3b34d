//! Machine lifecycle and state handlers

use cnc_bridge_shared::{codes, timing, CommandResult, Reply, ReplyBody, TaskState};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

use crate::context::AppContext;
use crate::link::Action;

#[derive(Debug, Deserialize)]
pub struct SetStateArgs {
    pub state: TaskState,
}

/// Launch the controller and wait until it answers status polls
pub async fn start_cnc(ctx: &AppContext) -> Reply {
    let name = ctx.link.name();
    if ctx.status_poller.poll_status().await.is_some() {
        info!("[CNC] {} already running, ignoring start", name);
        return CommandResult::new(codes::ALREADY_RUNNING, "already running").into();
    }

    info!("[CNC] Starting {}", name);
    if let Err(e) = ctx.link.launch().await {
        error!("[CNC] Failed to launch {}: {}", name, e);
        return CommandResult::new(codes::START_FAILED, format!("controller start error: {}", e))
            .into();
    }

    let deadline = Instant::now() + ctx.start_timeout;
    while ctx.status_poller.poll_status().await.is_none() {
        if Instant::now() >= deadline {
            error!("[CNC] {} did not come up within {:?}", name, ctx.start_timeout);
            return CommandResult::new(codes::START_FAILED, "controller start timed out").into();
        }
        tokio::time::sleep(Duration::from_millis(timing::START_POLL_INTERVAL_MS)).await;
    }

    ctx.error_poller.reset_channel().await;
    info!("[CNC] {} started", name);
    CommandResult::ok().into()
}

/// Ask the controller to exit
pub async fn stop_cnc(ctx: &AppContext) -> Reply {
    match ctx.link.shutdown().await {
        Ok(()) => {
            info!("[CNC] Stopping {}", ctx.link.name());
            ctx.status_poller.poll_status().await;
            CommandResult::ok().into()
        }
        Err(e) => {
            error!("[CNC] Failed to stop {}: {}", ctx.link.name(), e);
            CommandResult::new(codes::COMMAND_ERROR, format!("controller stop error: {}", e)).into()
        }
    }
}

/// Latest cached status in wire form
pub async fn current_state(ctx: &AppContext) -> Reply {
    match ctx.cache.snapshot().await {
        Some(status) => Reply::status(&status),
        None => CommandResult::not_running().into(),
    }
}

pub async fn set_state(ctx: &AppContext, args: SetStateArgs) -> Reply {
    ctx.executor
        .execute(&Action::State(args.state), timing::STATE_TIMEOUT)
        .await
        .into()
}

/// Static machine description read from the INI at startup
pub fn ini_params(ctx: &AppContext) -> Reply {
    let result = if ctx.machine.axis_num == 0 {
        CommandResult::new(codes::NOT_FOUND, "no axis info found")
    } else {
        CommandResult::ok()
    };
    Reply::new(result, ReplyBody::Machine(ctx.machine.clone()))
}
