use std::sync::{Arc, Mutex};

use digest_pulse::{audio::AudioMerger, Error};

#[derive(Clone, Default)]
pub struct MockMerger {
    pub calls: Arc<Mutex<Vec<Vec<Vec<u8>>>>>,
    pub fail_with: Option<String>,
}

impl MockMerger {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl AudioMerger for MockMerger {
    async fn merge(&self, segments: Vec<Vec<u8>>) -> Result<Vec<u8>, Error> {
        self.calls.lock().unwrap().push(segments.clone());
        if segments.is_empty() {
            return Err(Error::Merge("no segments to merge".into()));
        }
        if let Some(ref msg) = self.fail_with {
            return Err(Error::Merge(msg.clone()));
        }
        Ok(segments.concat())
    }
}
