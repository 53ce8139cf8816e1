pub mod edge;
pub mod openai;
pub mod subtitles;

use std::future::Future;

use crate::{error::Error, script::Speaker};

pub use edge::{EdgeTts, Synthesis};
pub use openai::OpenAISpeech;

pub trait SpeechSynthesizer {
    /// Short provider name used in logs
    fn provider(&self) -> &'static str;

    fn synthesize(
        &self,
        text: &str,
        speaker: Speaker,
    ) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;
}

/// Provider specific voice ids for the two hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voices {
    pub male: String,
    pub female: String,
}

impl Voices {
    pub fn new(male: impl Into<String>, female: impl Into<String>) -> Self {
        Self {
            male: male.into(),
            female: female.into(),
        }
    }

    pub fn for_speaker(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Male => &self.male,
            Speaker::Female => &self.female,
        }
    }
}

/// Speech provider picked from configuration
#[derive(Debug, Clone)]
pub enum Synthesizer {
    Edge(EdgeTts),
    OpenAI(OpenAISpeech),
}

impl SpeechSynthesizer for Synthesizer {
    fn provider(&self) -> &'static str {
        match self {
            Synthesizer::Edge(tts) => tts.provider(),
            Synthesizer::OpenAI(tts) => tts.provider(),
        }
    }

    async fn synthesize(&self, text: &str, speaker: Speaker) -> Result<Vec<u8>, Error> {
        match self {
            Synthesizer::Edge(tts) => tts.synthesize(text, speaker).await,
            Synthesizer::OpenAI(tts) => tts.synthesize(text, speaker).await,
        }
    }
}
