use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use anyhow::Context;

use crate::store::{ArtifactStore, Locator};

/// Stores every artifact as a file below `root`; keys containing `/` map to
/// nested directories.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !is_plain {
            anyhow::bail!("Invalid artifact key: {key:?}");
        }
        Ok(self.root.join(relative))
    }

    fn locator(&self, key: &str, path: &Path) -> Locator {
        Locator::for_key(
            self.public_base_url.as_deref(),
            key,
            format!("file://{}", path.display()),
        )
    }
}

impl ArtifactStore for LocalArtifactStore {
    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to check {}", path.display()))
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<Locator> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // write-then-rename so readers never observe a half written file
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".partial");
        let tmp_path = path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to move artifact into {}", path.display()))?;

        tracing::info!(key, size = bytes.len(), content_type, "Stored artifact");
        Ok(self.locator(key, &path))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get_and_delete() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path(), None);
        let key = "content:test:hacker-news:2025-03-04";

        assert!(!store.exists(key).await.unwrap());

        let locator = store
            .put(key, b"{\"intro\":\"hi\"}".to_vec(), "application/json")
            .await
            .unwrap();
        assert!(locator.as_str().starts_with("file://"));
        assert!(store.exists(key).await.unwrap());
        assert_eq!(store.get(key).await.unwrap(), b"{\"intro\":\"hi\"}");

        store.delete(key).await.unwrap();
        assert!(!store.exists(key).await.unwrap());
        // deleting twice is fine
        store.delete(key).await.unwrap();
    }

    #[tokio::test]
    async fn test_nested_keys_and_overwrite() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path(), Some("https://cdn.test".into()));
        let key = "audio/test/hacker-news-2025-03-04.mp3";

        store.put(key, vec![1, 2, 3], "audio/mpeg").await.unwrap();
        let locator = store.put(key, vec![4, 5], "audio/mpeg").await.unwrap();

        assert_eq!(
            locator.as_str(),
            "https://cdn.test/audio/test/hacker-news-2025-03-04.mp3"
        );
        assert_eq!(store.get(key).await.unwrap(), vec![4, 5]);
        assert!(dir.path().join("audio/test").is_dir());
    }

    #[tokio::test]
    async fn test_zero_length_object_still_exists() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path(), None);

        store.put("empty", Vec::new(), "application/json").await.unwrap();
        assert!(store.exists("empty").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path(), None);

        assert!(store.get("../etc/passwd").await.is_err());
        assert!(store.put("/abs", vec![], "x").await.is_err());
        assert!(store.exists("").await.is_err());
    }
}
