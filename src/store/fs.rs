//! Filesystem-backed blob store rooted at a data directory.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::BlobStore;

/// Blob store over a directory tree. Parent directories are created on write.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a store path to an absolute filesystem path, rejecting any
    /// component that would escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        for part in path.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                bail!("invalid blob path: {path}");
            }
            resolved.push(part);
        }
        Ok(resolved)
    }

    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, path: &str) -> Result<String> {
        let resolved = self.resolve(path)?;
        tokio::fs::read_to_string(&resolved)
            .await
            .with_context(|| format!("failed to read blob: {path}"))
    }

    async fn create(&self, path: &str, content: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        self.ensure_parent(&resolved).await?;

        // create_new makes the existence check atomic at the filesystem level.
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&resolved)
            .await
            .with_context(|| format!("failed to create blob: {path}"))?;
        file.write_all(content.as_bytes())
            .await
            .with_context(|| format!("failed to write blob: {path}"))?;
        file.flush().await?;
        Ok(())
    }

    async fn modify(&self, path: &str, content: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        self.ensure_parent(&resolved).await?;
        tokio::fs::write(&resolved, content)
            .await
            .with_context(|| format!("failed to write blob: {path}"))
    }

    async fn list(&self, folder: &str) -> Result<Vec<String>> {
        let resolved = self.resolve(folder)?;
        let mut names = Vec::new();

        let mut dir = match tokio::fs::read_dir(&resolved).await {
            Ok(dir) => dir,
            // A folder that was never written to is just empty.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to list folder: {folder}"))
            }
        };

        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let resolved = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&resolved).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.create("characters/aria/card.md", "hello").await.unwrap();
        assert_eq!(store.read("characters/aria/card.md").await.unwrap(), "hello");
        assert!(store.exists("characters/aria/card.md").await.unwrap());
    }

    #[tokio::test]
    async fn create_fails_on_existing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.create("a.md", "first").await.unwrap();
        assert!(store.create("a.md", "second").await.is_err());
        // modify overwrites
        store.modify("a.md", "second").await.unwrap();
        assert_eq!(store.read("a.md").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn list_missing_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.list("lorebooks").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_returns_sorted_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.create("lorebooks/b.md", "").await.unwrap();
        store.create("lorebooks/a.md", "").await.unwrap();
        assert_eq!(store.list("lorebooks").await.unwrap(), vec!["a.md", "b.md"]);
    }

    #[tokio::test]
    async fn path_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.read("../outside.md").await.is_err());
        assert!(store.create("a/../../b.md", "x").await.is_err());
    }
}
