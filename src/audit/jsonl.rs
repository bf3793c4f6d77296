//! Append-only JSON Lines audit file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::audit::{AuditRecord, AuditSink};
use crate::error::AuditError;

/// Writes one JSON object per line, flushing after each record.
///
/// The file handle sits behind a mutex, so concurrent sessions sharing one
/// log never interleave lines.
pub struct JsonlAuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditLog {
    /// Open `path` for appending, creating it (and its parent directory) if needed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in a log file.
    ///
    /// Blank lines are skipped. So are lines that do not parse, such as a
    /// record torn by a crash mid-write; each one is logged with its line
    /// number.
    pub async fn read_all(path: &Path) -> Result<Vec<AuditRecord>, AuditError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let mut records = Vec::new();

        for (index, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = index + 1,
                        error = %e,
                        "Skipping unreadable audit record"
                    );
                }
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl AuditSink for JsonlAuditLog {
    async fn record(&self, entry: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
