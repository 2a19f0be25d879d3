//! Newline-delimited ledger file.

use crate::domain::content_id::ContentId;
use crate::error::BoxError;
use crate::ports::ledger::ProcessedLedger;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Append-only text file, one committed id per line.
///
/// No file locking: concurrent runs against the same file can interleave.
#[derive(Clone, Debug)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every committed id, oldest first. A missing file is an empty ledger.
    pub async fn entries(&self) -> std::io::Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ProcessedLedger for FileLedger {
    async fn contains(&self, id: &ContentId) -> Result<bool, BoxError> {
        let entries = self.entries().await?;
        Ok(entries.iter().any(|entry| entry == id.as_str()))
    }

    async fn commit(&self, id: &ContentId) -> Result<(), BoxError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Keep one id per line even if the file was edited by hand.
        let needs_newline = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes.last().is_some_and(|b| *b != b'\n'),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let line = if needs_newline {
            format!("\n{}\n", id)
        } else {
            format!("{}\n", id)
        };
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn id(locator: &str) -> ContentId {
        ContentId::from_locator(locator).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_ledger() {
        let dir = tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("downloaded_videos.txt"));
        assert!(!ledger.contains(&id("watch?v=abc")).await.unwrap());
        assert!(ledger.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_then_contains() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("downloaded_videos.txt");
        let ledger = FileLedger::new(&path);

        ledger.commit(&id("watch?v=abc")).await.unwrap();
        ledger.commit(&id("watch?v=def")).await.unwrap();

        assert!(ledger.contains(&id("watch?v=abc")).await.unwrap());
        assert!(ledger.contains(&id("watch?v=def")).await.unwrap());
        assert!(!ledger.contains(&id("watch?v=ab")).await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "abc\ndef\n");
    }

    #[tokio::test]
    async fn test_history_survives_new_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.txt");
        FileLedger::new(&path).commit(&id("watch?v=first")).await.unwrap();

        let reopened = FileLedger::new(&path);
        assert!(reopened.contains(&id("watch?v=first")).await.unwrap());
    }

    #[tokio::test]
    async fn test_tolerates_hand_edited_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.txt");
        std::fs::write(&path, "  old1 \r\n\nold2").unwrap();
        let ledger = FileLedger::new(&path);

        assert!(ledger.contains(&id("watch?v=old1")).await.unwrap());
        ledger.commit(&id("watch?v=new")).await.unwrap();
        assert_eq!(ledger.entries().await.unwrap(), vec!["old1", "old2", "new"]);
    }
}
