use crate::{
    error::Error,
    openai::OpenAIClient,
    script::Speaker,
    tts::{SpeechSynthesizer, Voices},
};

/// Speech synthesis through the `/audio/speech` endpoint of an OpenAI
/// compatible API
#[derive(Debug, Clone)]
pub struct OpenAISpeech {
    client: OpenAIClient,
    voices: Voices,
}

impl OpenAISpeech {
    pub const DEFAULT_MALE_VOICE: &str = "onyx";
    pub const DEFAULT_FEMALE_VOICE: &str = "nova";

    pub fn new(client: OpenAIClient, voices: Voices) -> Self {
        Self { client, voices }
    }
}

impl SpeechSynthesizer for OpenAISpeech {
    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn synthesize(&self, text: &str, speaker: Speaker) -> Result<Vec<u8>, Error> {
        let voice = self.voices.for_speaker(speaker);
        let audio = self
            .client
            .send_speech_request(text, voice)
            .await
            .inspect_err(|e| tracing::error!(error = %e, voice, "Failed to synthesize speech"))?;

        if audio.is_empty() {
            return Err(Error::TransientUpstream("Speech API returned no audio".into()));
        }
        Ok(audio)
    }
}
