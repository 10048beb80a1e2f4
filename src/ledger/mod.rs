//! Append-only metadata ledger
//!
//! One JSON object per line, one line per successfully ingested file. The
//! ledger is the source of truth for `GET /files`. Appends from concurrent
//! upload handlers serialize behind an internal lock so lines are never
//! interleaved at the byte level. Reads are tolerant: a corrupt line is
//! skipped with a warning instead of hiding the rest of the ledger.
//!
//! The file is truncated at process start; this service makes no durability
//! claim across restarts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::Result;

/// Metadata for one ingested file.
///
/// Created only after the content store has confirmed the bytes are stored;
/// immutable afterwards. `cid` is the stable identity for retrieval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Display name as supplied by the uploader, not guaranteed unique
    pub filename: String,
    /// Opaque content identifier returned by the content store
    pub cid: String,
    /// Byte length of the original content
    pub size: u64,
    /// MIME type reported by the uploader. Advisory only, never trusted.
    #[serde(rename = "type")]
    pub content_type: String,
}

/// Append-only ledger backed by a single JSON-lines file.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    // Serializes concurrent appends; list_all reads the file wholesale and
    // does not need the lock.
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Truncate the ledger to empty, creating the file if missing.
    /// Called once at process start.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        File::create(&self.path).await?;
        Ok(())
    }

    /// Durably record one file. Safe to call from concurrent handlers.
    pub async fn append(&self, record: &FileRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Every record currently persisted, in append order.
    ///
    /// Malformed lines (bad JSON, or any of the four fields missing) are
    /// skipped rather than failing the whole read.
    pub async fn list_all(&self) -> Result<Vec<FileRecord>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;

        let mut records = Vec::new();
        for (lineno, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FileRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(line = lineno + 1, error = %e, "skipping malformed ledger line");
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str, size: u64) -> FileRecord {
        FileRecord {
            filename: name.to_string(),
            cid: format!("cid-{name}"),
            size,
            content_type: "text/plain".to_string(),
        }
    }

    async fn fresh_ledger(dir: &TempDir) -> Ledger {
        let ledger = Ledger::new(dir.path().join("ledger.jsonl"));
        ledger.reset().await.expect("reset");
        ledger
    }

    #[tokio::test]
    async fn append_then_list_preserves_order() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = fresh_ledger(&dir).await;

        for i in 0..5 {
            ledger.append(&record(&format!("f{i}"), i)).await.expect("append");
        }

        let records = ledger.list_all().await.expect("list");
        assert_eq!(records.len(), 5);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.filename, format!("f{i}"));
        }
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped_not_fatal() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = fresh_ledger(&dir).await;

        ledger.append(&record("good1", 1)).await.expect("append");
        ledger.append(&record("good2", 2)).await.expect("append");

        // Corrupt the middle of the file by hand: garbage, truncated JSON,
        // and a record missing the cid field.
        let path = dir.path().join("ledger.jsonl");
        let mut contents = std::fs::read_to_string(&path).expect("read");
        contents.push_str("not json at all\n");
        contents.push_str("{\"filename\":\"trunc\n");
        contents.push_str("{\"filename\":\"nocid\",\"size\":3,\"type\":\"text/plain\"}\n");
        std::fs::write(&path, contents).expect("write");

        ledger.append(&record("good3", 3)).await.expect("append");

        let records = ledger.list_all().await.expect("list");
        let names: Vec<&str> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["good1", "good2", "good3"]);
    }

    #[tokio::test]
    async fn reset_truncates_existing_records() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = fresh_ledger(&dir).await;

        ledger.append(&record("stale", 9)).await.expect("append");
        ledger.reset().await.expect("reset");

        assert!(ledger.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_never_interleave() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = std::sync::Arc::new(fresh_ledger(&dir).await);

        let mut handles = Vec::new();
        for i in 0..20u64 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.append(&record(&format!("c{i}"), i)).await
            }));
        }
        for h in handles {
            h.await.expect("join").expect("append");
        }

        // Every line must parse: interleaved writes would corrupt lines and
        // the tolerant reader would silently drop them.
        let records = ledger.list_all().await.expect("list");
        assert_eq!(records.len(), 20);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let ledger = Ledger::new(dir.path().join("never-created.jsonl"));
        assert!(ledger.list_all().await.is_err());
    }

    #[test]
    fn wire_field_is_named_type() {
        let json = serde_json::to_string(&record("a", 1)).expect("serialize");
        assert!(json.contains("\"type\":"));
        assert!(!json.contains("content_type"));
    }
}
