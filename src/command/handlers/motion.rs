//! Homing, jogging and MDI handlers

use cnc_bridge_shared::{timing, CommandResult, Reply, TaskMode};
use serde::Deserialize;
use tracing::debug;

use crate::context::AppContext;
use crate::link::{Action, Jog};

#[derive(Debug, Deserialize)]
pub struct AxisArgs {
    pub axis_number: u32,
}

#[derive(Debug, Deserialize)]
pub struct ContinuousJogArgs {
    pub axis_number: u32,
    pub velocity: f64,
}

#[derive(Debug, Deserialize)]
pub struct IncrementJogArgs {
    pub axis_number: u32,
    pub velocity: f64,
    pub distance: f64,
}

#[derive(Debug, Deserialize)]
pub struct MdiArgs {
    pub command: String,
}

pub async fn home_axis(ctx: &AppContext, args: AxisArgs) -> Reply {
    ctx.executor
        .execute(&Action::Home(args.axis_number), timing::HOME_TIMEOUT)
        .await
        .into()
}

/// Home every configured axis in order, stopping at the first failure.
/// A machine with no configured axes has nothing to home and succeeds.
pub async fn home_all(ctx: &AppContext) -> Reply {
    ctx.executor
        .execute(&Action::Mode(TaskMode::Manual), timing::NO_WAIT)
        .await;

    let mut result = CommandResult::ok();
    for axis in 0..ctx.machine.axis_num as u32 {
        result = ctx
            .executor
            .execute(&Action::Home(axis), timing::HOME_TIMEOUT)
            .await;
        if !result.is_ok() {
            break;
        }
    }
    result.into()
}

pub async fn move_axis_stop(ctx: &AppContext, args: AxisArgs) -> Reply {
    ctx.executor
        .execute(
            &Action::Jog(Jog::Stop {
                axis: args.axis_number,
            }),
            timing::NO_WAIT,
        )
        .await
        .into()
}

pub async fn move_axis_continuous(ctx: &AppContext, args: ContinuousJogArgs) -> Reply {
    ctx.executor
        .execute(&Action::Mode(TaskMode::Manual), timing::NO_WAIT)
        .await;

    let jog = Jog::Continuous {
        axis: args.axis_number,
        velocity: args.velocity,
    };
    ctx.executor
        .execute(&Action::Jog(jog), timing::NO_WAIT)
        .await
        .into()
}

pub async fn move_axis_increment(ctx: &AppContext, args: IncrementJogArgs) -> Reply {
    ctx.executor
        .execute(&Action::Mode(TaskMode::Manual), timing::NO_WAIT)
        .await;

    let jog = Jog::Increment {
        axis: args.axis_number,
        velocity: args.velocity,
        distance: args.distance,
    };
    ctx.executor
        .execute(&Action::Jog(jog), timing::NO_WAIT)
        .await
        .into()
}

pub async fn run_mdi(ctx: &AppContext, args: MdiArgs) -> Reply {
    let command = args.command.trim();
    if command.is_empty() {
        return CommandResult::invalid_args("empty MDI command").into();
    }

    debug!("[MDI] Running '{}'", command);
    ctx.executor
        .execute(&Action::Mdi(command.to_string()), timing::NO_WAIT)
        .await
        .into()
}
