use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use digest_pulse::{tts::SpeechSynthesizer, Error, Speaker};

#[derive(Clone, Default)]
pub struct MockSynthesizer {
    pub calls: Arc<Mutex<Vec<(String, Speaker)>>>,
    /// Texts that fail to synthesize
    pub fail_texts: HashSet<String>,
    pub fail_with: Option<String>,
}

impl MockSynthesizer {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn failing_on(texts: &[&str]) -> Self {
        Self {
            fail_texts: texts.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Bytes produced for one narration
    pub fn audio_for(text: &str, speaker: Speaker) -> Vec<u8> {
        format!("[{speaker}:{text}]").into_bytes()
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn provider(&self) -> &'static str {
        "mock"
    }

    async fn synthesize(&self, text: &str, speaker: Speaker) -> Result<Vec<u8>, Error> {
        self.calls.lock().unwrap().push((text.to_string(), speaker));
        if let Some(ref msg) = self.fail_with {
            return Err(Error::TransientUpstream(msg.clone()));
        }
        if self.fail_texts.contains(text) {
            return Err(Error::TransientUpstream(format!("cannot narrate {text}")));
        }
        Ok(Self::audio_for(text, speaker))
    }
}
