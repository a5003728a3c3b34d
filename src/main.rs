use anyhow::{Context, Result};
use clap::Parser;
use cnc_bridge::config::LogConfig;
use cnc_bridge::poller;
use cnc_bridge::{AppContext, BridgeConfig, CommandDispatcher, ControlLink, SimulatedMachine};
use cnc_bridge_shared::{CommandResult, ErrorEvent, MachineIni, Reply, Severity};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Bridge between a CNC controller and remote clients
#[derive(Parser, Debug)]
#[command(name = "cnc-bridge", version, about)]
struct Cli {
    /// Bridge configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Controller INI file, overrides `controller.ini_path`
    #[arg(long)]
    ini: Option<PathBuf>,
}

/// One console request: `{"command": "home_axis", "args": {"axis_number": 0}}`
#[derive(Debug, Deserialize)]
struct ConsoleRequest {
    command: String,
    #[serde(default)]
    args: Value,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(ini) = cli.ini {
        config.controller.ini_path = Some(ini);
    }

    init_tracing(&config.log);

    info!("CNC bridge starting: {}", config.controller.name);

    let ini = match &config.controller.ini_path {
        Some(path) => {
            info!("  Controller INI: {}", path.display());
            MachineIni::load(path).context("Failed to load controller INI")?
        }
        None => {
            warn!("No controller INI configured, machine description is empty");
            MachineIni::default()
        }
    };
    let axes = ini
        .find("TRAJ", "AXES")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let link: Arc<dyn ControlLink> = Arc::new(SimulatedMachine::new(
        config.controller.name.clone(),
        axes,
    ));
    info!("Controller link: {} ({} axes)", link.name(), axes);

    let ctx = Arc::new(AppContext::new(
        link,
        &ini,
        config.controller.staging_dir.clone(),
        config.controller.start_timeout(),
    ));

    // Controller messages end up in the bridge log as well
    ctx.observers
        .subscribe_errors(Arc::new(|event: &ErrorEvent| -> anyhow::Result<()> {
            match event.severity {
                Severity::Error => error!("[CNC] #{} {}", event.id, event.text),
                Severity::Info => info!("[CNC] #{} {}", event.id, event.text),
            }
            Ok(())
        }));

    let dispatcher = Arc::new(CommandDispatcher::new(ctx.clone()));

    if config.controller.autostart {
        let reply = dispatcher.handle_command("start_cnc", Value::Null).await;
        if !reply.result.is_ok() {
            warn!("Autostart failed: {}", reply.result.text);
        }
    }

    let polling = poller::start_polling(
        ctx.status_poller.clone(),
        ctx.error_poller.clone(),
        config.polling.status_interval(),
        config.polling.error_interval(),
    );

    let console_dispatcher = dispatcher.clone();
    tokio::spawn(async move {
        if let Err(e) = run_console(console_dispatcher).await {
            error!("Console failed: {}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down");
    polling.stop();
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);

    if log.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Line-oriented JSON console on stdin/stdout: one request per line, one reply per line
async fn run_console(dispatcher: Arc<CommandDispatcher>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<ConsoleRequest>(line) {
            Ok(request) => {
                debug!("[CONSOLE] {}", request.command);
                dispatcher
                    .handle_command(&request.command, request.args)
                    .await
                    .to_json()
            }
            Err(e) => {
                warn!("[CONSOLE] Malformed request: {}", e);
                Reply::from(CommandResult::invalid_args(e.to_string())).to_json()
            }
        };

        let mut out = reply.to_string();
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    debug!("[CONSOLE] stdin closed");
    Ok(())
}
