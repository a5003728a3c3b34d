//! Program (G-code) lifecycle handlers

use cnc_bridge_shared::{codes, timing, CommandResult, Reply, ReplyBody, TaskMode};
use serde::Deserialize;
use std::path::{Component, Path};
use tracing::{debug, info, warn};

use super::fresh_status;
use crate::context::AppContext;
use crate::link::{Action, AutoCommand};

#[derive(Debug, Deserialize)]
pub struct LoadGcodeArgs {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunGcodeArgs {
    #[serde(default)]
    pub line_number: i32,
}

/// A staged program name must be a single plain path component
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Stage uploaded content and open it as the current program
pub async fn load_gcode(ctx: &AppContext, args: LoadGcodeArgs) -> Reply {
    if !is_plain_file_name(&args.name) {
        return CommandResult::invalid_args(format!("invalid program name: {}", args.name)).into();
    }

    let path = ctx.staging_dir.join(&args.name);
    debug!("[PROGRAM] Staging {}", path.display());
    if let Err(e) = tokio::fs::write(&path, &args.content).await {
        warn!("[PROGRAM] Failed to stage {}: {}", path.display(), e);
        return CommandResult::new(
            codes::INVALID_ARGS,
            format!("failed to save {}: {}", path.display(), e),
        )
        .into();
    }

    ctx.executor
        .execute(&Action::ResetInterpreter, timing::NO_WAIT)
        .await;
    ctx.executor
        .execute(&Action::Mode(TaskMode::Auto), timing::PROGRAM_MODE_TIMEOUT)
        .await;
    let result = ctx
        .executor
        .execute(&Action::ProgramOpen(path.clone()), timing::PROGRAM_OPEN_TIMEOUT)
        .await;
    ctx.executor
        .execute(&Action::Mode(TaskMode::Manual), timing::PROGRAM_MODE_TIMEOUT)
        .await;

    if result.is_ok() {
        info!("[PROGRAM] Opened {}", path.display());
    }
    result.into()
}

pub async fn run_gcode(ctx: &AppContext, args: RunGcodeArgs) -> Reply {
    ctx.executor
        .execute(&Action::Mode(TaskMode::Auto), timing::PROGRAM_MODE_TIMEOUT)
        .await;

    debug!("[PROGRAM] Running from line {}", args.line_number);
    ctx.executor
        .execute(
            &Action::Auto(AutoCommand::Run {
                line: args.line_number,
            }),
            timing::NO_WAIT,
        )
        .await
        .into()
}

/// Execute one program step. Entering auto mode takes two extra steps
/// before the controller starts stepping through the program.
pub async fn step_gcode(ctx: &AppContext) -> Reply {
    let status = match fresh_status(ctx).await {
        Ok(status) => status,
        Err(reply) => return reply,
    };

    let step = Action::Auto(AutoCommand::Step);
    if status.task_mode != TaskMode::Auto {
        debug!("[PROGRAM] Entering auto mode for stepping");
        ctx.executor
            .execute(&Action::Mode(TaskMode::Auto), timing::PROGRAM_MODE_TIMEOUT)
            .await;
        ctx.executor.execute(&step, timing::NO_WAIT).await;
        ctx.executor.execute(&step, timing::NO_WAIT).await;
    }

    ctx.executor.execute(&step, timing::NO_WAIT).await.into()
}

pub async fn pause_gcode(ctx: &AppContext) -> Reply {
    ctx.executor
        .execute(&Action::Auto(AutoCommand::Pause), timing::NO_WAIT)
        .await
        .into()
}

pub async fn resume_gcode(ctx: &AppContext) -> Reply {
    ctx.executor
        .execute(&Action::Auto(AutoCommand::Resume), timing::NO_WAIT)
        .await
        .into()
}

pub async fn stop_gcode(ctx: &AppContext) -> Reply {
    ctx.executor
        .execute(&Action::Abort, timing::NO_WAIT)
        .await
        .into()
}

pub async fn reset_interpreter(ctx: &AppContext) -> Reply {
    ctx.executor
        .execute(&Action::ResetInterpreter, timing::NO_WAIT)
        .await
        .into()
}

/// Text of the currently opened program, empty when none is open
pub async fn gcode_content(ctx: &AppContext) -> Reply {
    let status = match fresh_status(ctx).await {
        Ok(status) => status,
        Err(reply) => return reply,
    };

    if status.file.is_empty() {
        debug!("[PROGRAM] No program opened");
        return Reply::new(
            CommandResult::ok(),
            ReplyBody::Content {
                content: String::new(),
            },
        );
    }

    match tokio::fs::read_to_string(&status.file).await {
        Ok(content) => Reply::new(CommandResult::ok(), ReplyBody::Content { content }),
        Err(e) => {
            warn!("[PROGRAM] Failed to read {}: {}", status.file, e);
            CommandResult::new(
                codes::NOT_FOUND,
                format!("failed to read {}: {}", status.file, e),
            )
            .into()
        }
    }
}
