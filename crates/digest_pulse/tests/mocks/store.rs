use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use digest_store::{ArtifactStore, Locator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory store that records every operation as `"<op> <key>"`
#[derive(Clone, Default)]
pub struct MockStore {
    pub objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    pub ops: Arc<Mutex<Vec<String>>>,
    /// Keys whose `put` fails
    pub fail_puts: HashSet<String>,
    pub fail_with: Option<String>,
}

impl MockStore {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn failing_put(mut self, key: &str) -> Self {
        self.fail_puts.insert(key.to_string());
        self
    }

    pub fn seed(&self, key: &str, bytes: Vec<u8>, content_type: &str) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    pub fn puts(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter(|op| op.starts_with("put "))
            .collect()
    }

    fn record(&self, op: &str, key: &str) -> anyhow::Result<()> {
        self.ops.lock().unwrap().push(format!("{op} {key}"));
        match self.fail_with {
            Some(ref msg) => Err(anyhow::anyhow!("{}", msg)),
            None => Ok(()),
        }
    }
}

impl ArtifactStore for MockStore {
    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        self.record("exists", key)?;
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        self.record("get", key)?;
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| anyhow::anyhow!("{key} not found"))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<Locator> {
        self.record("put", key)?;
        if self.fail_puts.contains(key) {
            anyhow::bail!("upload of {key} rejected");
        }
        self.seed(key, bytes, content_type);
        Ok(Locator::new(format!("mem://{key}")))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.record("delete", key)?;
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
