//! Tool table handlers

use cnc_bridge_shared::{codes, timing, CommandResult, Reply, ReplyBody, ToolRecord};
use serde::Deserialize;
use tracing::warn;

use crate::context::AppContext;
use crate::link::Action;
use crate::tool_table::{AddOutcome, ToolTableError, ToolTableStore};

#[derive(Debug, Deserialize)]
pub struct AddToolArgs {
    pub tool: ToolRecord,
}

#[derive(Debug, Deserialize)]
pub struct DeleteToolsArgs {
    pub tools: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateToolsArgs {
    pub tools_data: Vec<ToolRecord>,
}

fn store(ctx: &AppContext) -> Result<&ToolTableStore, Reply> {
    ctx.tool_table
        .as_ref()
        .ok_or_else(|| CommandResult::new(codes::NOT_FOUND, "no tool table configured").into())
}

fn failure(e: ToolTableError) -> Reply {
    warn!("[TOOLS] {}", e);
    CommandResult::new(e.code(), e.to_string()).into()
}

pub async fn tools_data(ctx: &AppContext) -> Reply {
    let store = match store(ctx) {
        Ok(store) => store,
        Err(reply) => return reply,
    };

    match store.read().await {
        Ok(tools) => Reply::new(CommandResult::ok(), ReplyBody::Tools { tools }),
        Err(e) => failure(e),
    }
}

pub async fn add_tool(ctx: &AppContext, args: AddToolArgs) -> Reply {
    let store = match store(ctx) {
        Ok(store) => store,
        Err(reply) => return reply,
    };

    match store.add(&args.tool).await {
        Ok(AddOutcome::Added) => CommandResult::ok().into(),
        Ok(AddOutcome::AlreadyExists) => {
            CommandResult::new(codes::ALREADY_EXISTS, "already exists in tool table").into()
        }
        Err(e) => failure(e),
    }
}

pub async fn delete_tools(ctx: &AppContext, args: DeleteToolsArgs) -> Reply {
    let store = match store(ctx) {
        Ok(store) => store,
        Err(reply) => return reply,
    };

    match store.remove(&args.tools).await {
        Ok(()) => CommandResult::ok().into(),
        Err(e) => failure(e),
    }
}

pub async fn update_tools(ctx: &AppContext, args: UpdateToolsArgs) -> Reply {
    let store = match store(ctx) {
        Ok(store) => store,
        Err(reply) => return reply,
    };

    match store.update(&args.tools_data).await {
        Ok(()) => CommandResult::ok().into(),
        Err(e) => failure(e),
    }
}

/// Ask the controller to re-read the table after an edit
pub async fn reload_tool_table(ctx: &AppContext) -> Reply {
    ctx.executor
        .execute(&Action::LoadToolTable, timing::NO_WAIT)
        .await
        .into()
}
