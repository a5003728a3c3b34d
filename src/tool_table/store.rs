//! Tool Table Store
//!
//! Reads and edits the controller's tool table file. Destructive edits
//! (remove, update) first copy the current file to `<file>.bak` and only
//! touch the live file once that copy is on disk.

use cnc_bridge_shared::tool_table::{format_line, parse_line};
use cnc_bridge_shared::{codes, ToolKey, ToolRecord};
use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ToolTableError {
    #[error("No tool-number provided")]
    MissingToolNumber,

    #[error("Invalid tool-number: {0}")]
    InvalidToolNumber(String),

    #[error("Duplicate tool-number: {0}")]
    DuplicateToolNumber(i64),

    #[error("Invalid value for tool field '{0}'")]
    MalformedField(ToolKey),

    #[error("Invalid tool-data provided")]
    EmptyRecord,

    #[error("Failed to read tool table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to back up tool table to {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write tool table {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ToolTableError {
    /// Result code reported to clients
    pub fn code(&self) -> i32 {
        match self {
            ToolTableError::MissingToolNumber
            | ToolTableError::InvalidToolNumber(_)
            | ToolTableError::DuplicateToolNumber(_)
            | ToolTableError::MalformedField(_) => codes::INVALID_ARGS,
            ToolTableError::Read { .. } | ToolTableError::Backup { .. } => codes::NOT_FOUND,
            ToolTableError::EmptyRecord => codes::EMPTY_RECORD,
            ToolTableError::Write { .. } => codes::WRITE_FAILED,
        }
    }
}

/// Outcome of a successful `add`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// A record with the same tool number is already in the table; nothing was written
    AlreadyExists,
}

pub struct ToolTableStore {
    path: PathBuf,
    /// Held for the whole read-check-write of every edit
    edit: Mutex<()>,
}

impl ToolTableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            edit: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Parse every non-blank line of the table
    pub async fn read(&self) -> Result<Vec<ToolRecord>, ToolTableError> {
        let text = self.read_text().await?;
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_line)
            .collect())
    }

    /// Append a tool unless its tool number is already present
    pub async fn add(&self, record: &ToolRecord) -> Result<AddOutcome, ToolTableError> {
        let tool_number = validate(record)?;
        let _edit = self.edit.lock().await;

        let text = match self.read_text().await {
            Ok(text) => text,
            Err(ToolTableError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                String::new()
            }
            Err(e) => return Err(e),
        };

        if text
            .lines()
            .any(|line| parse_line(line).tool_number() == Some(tool_number))
        {
            info!("[TOOLS] Tool {} already in table, not adding", tool_number);
            return Ok(AddOutcome::AlreadyExists);
        }

        let line = format_line(record);
        if line.is_empty() {
            return Err(ToolTableError::EmptyRecord);
        }

        let mut entry = String::new();
        if !text.is_empty() && !text.ends_with('\n') {
            entry.push('\n');
        }
        entry.push_str(&line);
        entry.push('\n');

        debug!("[TOOLS] Appending '{}'", line);
        self.append(&entry).await?;
        Ok(AddOutcome::Added)
    }

    /// Drop every line whose tool number is listed. Any negative number in
    /// the list turns the call into a no-op (after the backup).
    pub async fn remove(&self, tool_numbers: &[i64]) -> Result<(), ToolTableError> {
        let _edit = self.edit.lock().await;
        let text = self.read_text().await?;
        self.backup(&text).await?;

        if tool_numbers.iter().any(|n| *n < 0) {
            debug!("[TOOLS] Skip marker in removal list, nothing removed");
            return Ok(());
        }

        let remove: HashSet<i64> = tool_numbers.iter().copied().collect();
        let kept: String = text
            .split_inclusive('\n')
            .filter(|line| match parse_line(line).tool_number() {
                Some(n) => !remove.contains(&n),
                None => true,
            })
            .collect();

        info!("[TOOLS] Removing tools {:?}", tool_numbers);
        self.write_all(&kept).await
    }

    /// Replace the whole table with `records`, in the given order
    pub async fn update(&self, records: &[ToolRecord]) -> Result<(), ToolTableError> {
        let mut seen = HashSet::new();
        for record in records {
            let tool_number = validate(record)?;
            if !seen.insert(tool_number) {
                return Err(ToolTableError::DuplicateToolNumber(tool_number));
            }
        }

        let _edit = self.edit.lock().await;
        let current = match self.read_text().await {
            Ok(text) => text,
            Err(ToolTableError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                String::new()
            }
            Err(e) => return Err(e),
        };
        self.backup(&current).await?;

        let mut text = String::new();
        for record in records {
            text.push_str(&format_line(record));
            text.push('\n');
        }

        info!("[TOOLS] Rewriting table with {} tools", records.len());
        self.write_all(&text).await
    }

    async fn read_text(&self) -> Result<String, ToolTableError> {
        fs::read_to_string(&self.path)
            .await
            .map_err(|source| ToolTableError::Read {
                path: self.path.clone(),
                source,
            })
    }

    async fn backup(&self, current: &str) -> Result<(), ToolTableError> {
        let path = self.backup_path();
        fs::write(&path, current)
            .await
            .map_err(|source| ToolTableError::Backup { path, source })
    }

    async fn write_all(&self, text: &str) -> Result<(), ToolTableError> {
        fs::write(&self.path, text)
            .await
            .map_err(|source| ToolTableError::Write {
                path: self.path.clone(),
                source,
            })
    }

    async fn append(&self, text: &str) -> Result<(), ToolTableError> {
        let write_err = |source| ToolTableError::Write {
            path: self.path.clone(),
            source,
        };

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(write_err)?;
        file.write_all(text.as_bytes()).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)
    }
}

/// Check a record can be written as exactly one line and return its tool number
fn validate(record: &ToolRecord) -> Result<i64, ToolTableError> {
    let raw = record.get(ToolKey::T).ok_or(ToolTableError::MissingToolNumber)?;
    let tool_number = record
        .tool_number()
        .ok_or_else(|| ToolTableError::InvalidToolNumber(raw.to_string()))?;

    match record.malformed_field() {
        Some(key) => Err(ToolTableError::MalformedField(key)),
        None => Ok(tool_number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TABLE: &str = "T1 P1 D3 ;flat 3mm\nT2 P2 Z-10.5 ;drill\n\nT7 P7 ;probe\n";

    fn store_with(contents: Option<&str>) -> (TempDir, ToolTableStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.tbl");
        if let Some(text) = contents {
            std::fs::write(&path, text).unwrap();
        }
        (dir, ToolTableStore::new(path))
    }

    fn tool(t: &str) -> ToolRecord {
        ToolRecord::new().with(ToolKey::T, t)
    }

    #[tokio::test]
    async fn test_read_skips_blank_lines() {
        let (_dir, store) = store_with(Some(TABLE));
        let tools = store.read().await.unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[1].get(ToolKey::Z), Some("-10.5"));
        assert_eq!(tools[2].comment(), Some("probe"));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let (_dir, store) = store_with(None);
        let err = store.read().await.unwrap_err();
        assert_eq!(err.code(), -1);
    }

    #[tokio::test]
    async fn test_add_then_read_back() {
        let (_dir, store) = store_with(Some(""));
        let record = tool("5")
            .with(ToolKey::P, "10")
            .with(ToolKey::Comment, "Note");

        assert_eq!(store.add(&record).await.unwrap(), AddOutcome::Added);

        let tools = store.read().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].get(ToolKey::T), Some("5"));
        assert_eq!(tools[0].get(ToolKey::P), Some("10"));
        assert_eq!(tools[0].comment(), Some("note"));
    }

    #[tokio::test]
    async fn test_add_twice_leaves_file_unchanged() {
        let (_dir, store) = store_with(Some(TABLE));
        assert_eq!(store.add(&tool("5")).await.unwrap(), AddOutcome::Added);
        let after_first = std::fs::read(store.path()).unwrap();

        assert_eq!(store.add(&tool("5")).await.unwrap(), AddOutcome::AlreadyExists);
        assert_eq!(std::fs::read(store.path()).unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_add_validates_tool_number() {
        let (_dir, store) = store_with(Some(TABLE));

        let err = store
            .add(&ToolRecord::new().with(ToolKey::P, "3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolTableError::MissingToolNumber));
        assert_eq!(err.code(), -1);

        let err = store.add(&tool("abc")).await.unwrap_err();
        assert!(matches!(err, ToolTableError::InvalidToolNumber(_)));
        assert_eq!(err.code(), -1);

        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), TABLE);
    }

    #[tokio::test]
    async fn test_add_creates_missing_file() {
        let (_dir, store) = store_with(None);
        store.add(&tool("3").with(ToolKey::D, "6")).await.unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "T3 D6 \n");
    }

    #[tokio::test]
    async fn test_add_after_unterminated_last_line() {
        let (_dir, store) = store_with(Some("T1 P1 ;end mill"));
        store.add(&tool("2")).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            "T1 P1 ;end mill\nT2 \n"
        );
    }

    #[tokio::test]
    async fn test_remove_backs_up_first() {
        let (_dir, store) = store_with(Some(TABLE));
        store.remove(&[2, 7]).await.unwrap();

        assert_eq!(std::fs::read_to_string(store.backup_path()).unwrap(), TABLE);
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            "T1 P1 D3 ;flat 3mm\n\n"
        );
    }

    #[tokio::test]
    async fn test_remove_with_skip_marker_is_noop() {
        let (_dir, store) = store_with(Some(TABLE));
        store.remove(&[1, -1]).await.unwrap();

        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), TABLE);
        assert!(store.backup_path().exists());
    }

    #[tokio::test]
    async fn test_update_rewrites_table() {
        let (_dir, store) = store_with(Some(TABLE));
        let records = vec![
            tool("9").with(ToolKey::Comment, "chamfer"),
            tool("4").with(ToolKey::Z, "1.25"),
        ];
        store.update(&records).await.unwrap();

        assert_eq!(std::fs::read_to_string(store.backup_path()).unwrap(), TABLE);
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            "T9 ;chamfer\nT4 Z1.25 \n"
        );
    }

    #[tokio::test]
    async fn test_update_rejects_duplicates_before_backup() {
        let (_dir, store) = store_with(Some(TABLE));
        let err = store.update(&[tool("4"), tool("4")]).await.unwrap_err();

        assert!(matches!(err, ToolTableError::DuplicateToolNumber(4)));
        assert!(!store.backup_path().exists());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), TABLE);
    }

    #[tokio::test]
    async fn test_backup_failure_leaves_table_untouched() {
        let (_dir, store) = store_with(Some(TABLE));
        // A directory where the backup file should go makes the backup write fail
        std::fs::create_dir(store.backup_path()).unwrap();

        let err = store.remove(&[1]).await.unwrap_err();
        assert!(matches!(err, ToolTableError::Backup { .. }));

        let err = store.update(&[tool("8")]).await.unwrap_err();
        assert!(matches!(err, ToolTableError::Backup { .. }));

        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), TABLE);
    }

    #[tokio::test]
    async fn test_add_rejects_values_that_split_the_line() {
        let (_dir, store) = store_with(Some("T5 P1 \n"));

        let smuggled: ToolRecord =
            serde_json::from_value(serde_json::json!({"T": 6, ";": "x\nT5 P9 "})).unwrap();
        let err = store.add(&smuggled).await.unwrap_err();
        assert!(matches!(err, ToolTableError::MalformedField(ToolKey::Comment)));
        assert_eq!(err.code(), -1);

        let err = store
            .add(&tool("6").with(ToolKey::P, "1 T5"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolTableError::MalformedField(ToolKey::P)));

        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "T5 P1 \n");
    }

    #[tokio::test]
    async fn test_update_rejects_values_that_split_the_line() {
        let (_dir, store) = store_with(Some(TABLE));
        let records = vec![tool("4"), tool("6").with(ToolKey::Z, "1\nT4")];

        let err = store.update(&records).await.unwrap_err();
        assert!(matches!(err, ToolTableError::MalformedField(ToolKey::Z)));
        assert!(!store.backup_path().exists());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), TABLE);
    }

    #[tokio::test]
    async fn test_padded_tool_number_rejected() {
        let (_dir, store) = store_with(Some(""));
        let err = store.add(&tool(" 5")).await.unwrap_err();
        assert!(matches!(err, ToolTableError::InvalidToolNumber(_)));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_keep_tool_numbers_unique() {
        let (_dir, store) = store_with(Some(""));
        let store = std::sync::Arc::new(store);

        for _ in 0..20 {
            let tasks: Vec<_> = (0..4)
                .map(|_| {
                    let store = store.clone();
                    tokio::spawn(async move { store.add(&tool("5")).await.unwrap() })
                })
                .collect();

            let mut added = 0;
            for task in tasks {
                if task.await.unwrap() == AddOutcome::Added {
                    added += 1;
                }
            }
            assert_eq!(added, 1);

            let tools = store.read().await.unwrap();
            assert_eq!(tools.len(), 1);
            store.remove(&[5]).await.unwrap();
        }
    }
}
