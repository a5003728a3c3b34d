//! Application context shared by every command handler

use cnc_bridge_shared::{MachineDescriptor, MachineIni};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::command::CommandExecutor;
use crate::link::ControlLink;
use crate::observer::ObserverRegistry;
use crate::poller::{ErrorPoller, StatusCache, StatusPoller};
use crate::tool_table::ToolTableStore;

/// Everything a handler may touch, built once at startup
pub struct AppContext {
    pub link: Arc<dyn ControlLink>,
    pub cache: Arc<StatusCache>,
    pub observers: Arc<ObserverRegistry>,
    pub executor: CommandExecutor,
    pub status_poller: Arc<StatusPoller>,
    pub error_poller: Arc<ErrorPoller>,
    /// Absent when the INI names no tool table
    pub tool_table: Option<ToolTableStore>,
    pub machine: MachineDescriptor,
    pub staging_dir: PathBuf,
    pub start_timeout: Duration,
}

impl AppContext {
    pub fn new(
        link: Arc<dyn ControlLink>,
        ini: &MachineIni,
        staging_dir: PathBuf,
        start_timeout: Duration,
    ) -> Self {
        let cache = Arc::new(StatusCache::new());
        let observers = Arc::new(ObserverRegistry::new());

        let tool_table = ini.tool_table_path().map(ToolTableStore::new);
        match &tool_table {
            Some(store) => info!("Tool table: {}", store.path().display()),
            None => warn!("No [EMCIO] TOOL_TABLE in INI, tool table commands disabled"),
        }

        Self {
            executor: CommandExecutor::new(link.clone(), cache.clone()),
            status_poller: Arc::new(StatusPoller::new(
                link.clone(),
                cache.clone(),
                observers.clone(),
            )),
            error_poller: Arc::new(ErrorPoller::new(
                link.clone(),
                cache.clone(),
                observers.clone(),
            )),
            machine: MachineDescriptor::from_ini(ini),
            link,
            cache,
            observers,
            tool_table,
            staging_dir,
            start_timeout,
        }
    }
}
