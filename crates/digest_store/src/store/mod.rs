use std::{fmt, future::Future};

use serde::{Deserialize, Serialize};

pub mod local;
pub mod postgres;

pub trait ArtifactStore {
    fn exists(&self, key: &str) -> impl Future<Output = anyhow::Result<bool>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = anyhow::Result<Vec<u8>>> + Send;

    /// Writes `bytes` under `key`, replacing any previous object.
    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = anyhow::Result<Locator>> + Send;

    /// Removes `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl<T: ArtifactStore + Send + Sync> ArtifactStore for &T {
    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        (**self).exists(key).await
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<Locator> {
        (**self).put(key, bytes, content_type).await
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        (**self).delete(key).await
    }
}

/// Opaque, retrievable reference to a stored object (usually a URL)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// Joins `key` onto a public base url, falling back to `fallback` when no
    /// base url is configured.
    pub(crate) fn for_key(public_base_url: Option<&str>, key: &str, fallback: String) -> Self {
        match public_base_url {
            Some(base) => Self(format!("{}/{}", base.trim_end_matches('/'), key)),
            None => Self(fallback),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.0
    }
}

/// Backend picked at startup from configuration
#[derive(Debug, Clone)]
pub enum AnyArtifactStore {
    Postgres(postgres::PgArtifactStore),
    Local(local::LocalArtifactStore),
}

impl ArtifactStore for AnyArtifactStore {
    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        match self {
            Self::Postgres(store) => store.exists(key).await,
            Self::Local(store) => store.exists(key).await,
        }
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        match self {
            Self::Postgres(store) => store.get(key).await,
            Self::Local(store) => store.get(key).await,
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<Locator> {
        match self {
            Self::Postgres(store) => store.put(key, bytes, content_type).await,
            Self::Local(store) => store.put(key, bytes, content_type).await,
        }
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        match self {
            Self::Postgres(store) => store.delete(key).await,
            Self::Local(store) => store.delete(key).await,
        }
    }
}
