use crate::{error::Result, feed::ChangeFeed};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Replays recorded change-sets from the `*.json` files of a directory, in
/// file-name order
pub struct DirectoryFeed {
    root_path: PathBuf,
    pending: Option<VecDeque<PathBuf>>,
}

impl DirectoryFeed {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root_path: root.as_ref().to_path_buf(),
            pending: None,
        }
    }

    async fn list_change_set_files(&self) -> Result<VecDeque<PathBuf>> {
        if !self.root_path.exists() {
            return Ok(VecDeque::new());
        }

        let mut entries = fs::read_dir(&self.root_path).await?;
        let mut files: Vec<PathBuf> = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(path);
            }
        }

        files.sort();
        Ok(files.into())
    }
}

#[async_trait]
impl ChangeFeed for DirectoryFeed {
    async fn next_change_set(&mut self) -> Result<Option<Value>> {
        if self.pending.is_none() {
            self.pending = Some(self.list_change_set_files().await?);
        }
        let Some(path) = self.pending.as_mut().and_then(VecDeque::pop_front) else {
            return Ok(None);
        };

        let contents = fs::read_to_string(&path).await?;
        let change_set: Value = serde_json::from_str(&contents)?;
        Ok(Some(change_set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_directory_feed_reads_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("0002.json"), r#"{"changes": {"view": 2}}"#)
            .await
            .unwrap();
        fs::write(temp_dir.path().join("0001.json"), r#"{"changes": {"view": 1}}"#)
            .await
            .unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").await.unwrap();

        let mut feed = DirectoryFeed::new(temp_dir.path());
        let first = feed.next_change_set().await.unwrap().unwrap();
        let second = feed.next_change_set().await.unwrap().unwrap();

        assert_eq!(first["changes"]["view"], 1);
        assert_eq!(second["changes"]["view"], 2);
        assert!(feed.next_change_set().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let mut feed = DirectoryFeed::new(temp_dir.path().join("absent"));
        assert!(feed.next_change_set().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("0001.json"), "{not json").await.unwrap();

        let mut feed = DirectoryFeed::new(temp_dir.path());
        assert!(feed.next_change_set().await.is_err());
    }
}
