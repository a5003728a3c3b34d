//! Bridge Configuration
//!
//! Loaded from a TOML file; every section and field has a default so an
//! empty (or absent) file yields a runnable setup.

use anyhow::{Context, Result};
use cnc_bridge_shared::timing;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub controller: ControllerConfig,
    pub polling: PollingConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Name used in logs
    pub name: String,
    /// Controller INI file (machine description and tool table location)
    pub ini_path: Option<PathBuf>,
    /// Directory uploaded programs are written to before opening
    pub staging_dir: PathBuf,
    /// Launch the controller when the bridge starts
    pub autostart: bool,
    /// Upper bound on waiting for a launched controller to answer polls (ms)
    pub start_timeout_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: "controller".into(),
            ini_path: None,
            staging_dir: std::env::temp_dir(),
            autostart: false,
            start_timeout_ms: timing::START_TIMEOUT_MS,
        }
    }
}

impl ControllerConfig {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub status_interval_ms: u64,
    pub error_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_interval_ms: timing::STATUS_POLL_INTERVAL_MS,
            error_interval_ms: timing::ERROR_POLL_INTERVAL_MS,
        }
    }
}

impl PollingConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms.max(1))
    }

    pub fn error_interval(&self) -> Duration {
        Duration::from_millis(self.error_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid bridge configuration")
    }

    /// Load from `path`. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}
