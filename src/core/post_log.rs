//! Persisted log of already-published post ids.
//!
//! The log is a flat JSON array of strings. It only ever grows: the
//! in-memory [`ProcessedPosts`] offers no removal, so whatever is persisted
//! is always a superset of what was loaded.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

/// Set of processed post ids, in the order they were recorded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedPosts {
    ids: Vec<String>,
    index: HashSet<String>,
}

impl ProcessedPosts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a post id was already published
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Record a post id. Returns false if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.index.contains(&id) {
            return false;
        }
        self.index.insert(id.clone());
        self.ids.push(id);
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in recording order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl FromIterator<String> for ProcessedPosts {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut posts = Self::new();
        for id in iter {
            posts.insert(id);
        }
        posts
    }
}

/// Storage boundary for the processed-post log
#[async_trait]
pub trait PostLog: Send + Sync {
    /// Load the log, creating an empty one if none exists yet
    async fn load(&self) -> Result<ProcessedPosts>;

    /// Load the log without writing anything. A missing log reads as empty.
    async fn read(&self) -> Result<ProcessedPosts> {
        self.load().await
    }

    /// Overwrite the stored log with `posts`
    async fn persist(&self, posts: &ProcessedPosts) -> Result<()>;
}

/// [`PostLog`] backed by a JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonFileLog {
    path: PathBuf,
}

impl JsonFileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create state directory: {}", parent.display())
                })?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PostLog for JsonFileLog {
    async fn load(&self) -> Result<ProcessedPosts> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No post log found, creating an empty one");
            let empty = ProcessedPosts::new();
            self.persist(&empty).await?;
            return Ok(empty);
        }
        self.read().await
    }

    async fn read(&self) -> Result<ProcessedPosts> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No post log yet, reading as empty");
            return Ok(ProcessedPosts::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read post log: {}", self.path.display()))?;

        let ids: Vec<String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse post log: {}", self.path.display()))?;

        debug!(count = ids.len(), "Loaded post log");
        Ok(ids.into_iter().collect())
    }

    async fn persist(&self, posts: &ProcessedPosts) -> Result<()> {
        self.ensure_parent().await?;

        let json = serde_json::to_vec(posts.ids()).context("Failed to serialize post log")?;
        let path = self.path.clone();

        // Write beside the target and rename over it so readers never see a torn file
        tokio::task::spawn_blocking(move || -> Result<()> {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)
                .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
            tmp.write_all(&json).context("Failed to write post log")?;
            tmp.flush().context("Failed to flush post log")?;
            tmp.persist(&path)
                .with_context(|| format!("Failed to replace post log: {}", path.display()))?;
            Ok(())
        })
        .await
        .context("Post log writer task panicked")??;

        debug!(count = posts.len(), "Persisted post log");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_insert_is_idempotent() {
        let mut posts = ProcessedPosts::new();
        assert!(posts.insert("a"));
        assert!(posts.insert("b"));
        assert!(!posts.insert("a"));

        assert_eq!(posts.len(), 2);
        assert_eq!(posts.ids(), &["a".to_string(), "b".to_string()]);
        assert!(posts.contains("b"));
        assert!(!posts.contains("c"));
    }

    #[test]
    fn test_from_iter_drops_duplicates() {
        let posts: ProcessedPosts = ["x", "y", "x"].iter().map(|s| s.to_string()).collect();
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let temp = TempDir::new().unwrap();
        let log = JsonFileLog::new(temp.path().join("nested").join("posted.json"));

        let mut posts = log.load().await.unwrap();
        posts.insert("cid-1");
        posts.insert("cid-2");
        log.persist(&posts).await.unwrap();

        let reloaded = log.load().await.unwrap();
        assert_eq!(reloaded, posts);

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw, r#"["cid-1","cid-2"]"#);
    }

    #[tokio::test]
    async fn test_read_never_creates_the_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state").join("posted.json");
        let log = JsonFileLog::new(&path);

        let posts = log.read().await.unwrap();

        assert!(posts.is_empty());
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("posted.json");
        std::fs::write(&path, "{not json").unwrap();

        let log = JsonFileLog::new(&path);
        assert!(log.load().await.is_err());
    }
}
