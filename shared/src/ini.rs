//! Controller INI file reader
//!
//! The controller configuration is a plain INI file:
//! ```text
//! [SECTION]
//! KEY = VALUE   # comments start with '#' or ';'
//! ```
//! Lookups return the first matching key, which is what the controller does.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IniError {
    #[error("Failed to read INI file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct MachineIni {
    path: Option<PathBuf>,
    entries: Vec<(String, String, String)>,
}

impl MachineIni {
    /// Parse INI text. Lines that are neither sections nor `KEY = VALUE` are skipped.
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        let mut section = String::new();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = name.trim().to_string();
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let value = strip_trailing_comment(value).trim();
                entries.push((section.clone(), key.trim().to_string(), value.to_string()));
            }
        }

        Self {
            path: None,
            entries,
        }
    }

    /// Load and parse an INI file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IniError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| IniError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut ini = Self::parse(&text);
        ini.path = Some(path.to_path_buf());
        Ok(ini)
    }

    /// Look up `key` in `section`; empty values count as absent
    pub fn find(&self, section: &str, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, k, _)| s == section && k == key)
            .map(|(_, _, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Directory the INI was loaded from; relative paths inside it resolve against this
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Tool table file named by `[EMCIO] TOOL_TABLE`
    pub fn tool_table_path(&self) -> Option<PathBuf> {
        self.find("EMCIO", "TOOL_TABLE")
            .map(|file| self.base_dir().join(file))
    }
}

fn strip_trailing_comment(value: &str) -> &str {
    match value.find(" #") {
        Some(pos) => &value[..pos],
        None => value,
    }
}
