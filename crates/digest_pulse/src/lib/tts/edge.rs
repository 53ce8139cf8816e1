use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Url;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    script::Speaker,
    tts::{subtitles::estimate_srt, SpeechSynthesizer, Voices},
};

/// Client for a self-hosted edge-tts HTTP gateway that answers with base64
/// audio and optional SRT subtitles.
#[derive(Debug, Clone)]
pub struct EdgeTts {
    client: ClientWithMiddleware,
    api_url: Url,
    output_format: String,
    voices: Voices,
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    text: &'a str,
    stream: bool,
    get_srt: bool,
    voice_setting: VoiceSetting<'a>,
    audio_setting: AudioSetting<'a>,
}

#[derive(Debug, Serialize)]
struct VoiceSetting<'a> {
    voice_id: &'a str,
    speed: f64,
    #[serde(rename = "vol")]
    volume: f64,
    pitch: f64,
}

#[derive(Debug, Serialize)]
struct AudioSetting<'a> {
    format: &'a str,
    sample_rate: u32,
    bitrate: u32,
}

#[derive(Debug, Deserialize)]
struct TtsResponse {
    audio: String,
    #[serde(default)]
    srt: String,
}

/// Audio plus subtitles for one narration
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub audio: Vec<u8>,
    pub subtitles: String,
}

impl EdgeTts {
    pub const DEFAULT_MALE_VOICE: &str = "zh-CN-YunxiNeural";
    pub const DEFAULT_FEMALE_VOICE: &str = "zh-CN-XiaoxiaoNeural";

    pub fn new(
        api_url: &str,
        output_format: impl Into<String>,
        voices: Voices,
    ) -> Result<Self, Error> {
        let mut api_url =
            Url::parse(api_url).map_err(|_| Error::ParseError("Invalid edge TTS api url"))?;
        api_url
            .query_pairs_mut()
            .append_pair("group_id", "hacker-news")
            .append_pair("return_srt", "true");

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(2);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_url,
            output_format: output_format.into(),
            voices,
        })
    }

    /// Synthesizes `text` and returns the audio together with subtitles.
    /// When the gateway sends no subtitles a local estimate is used.
    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn synthesize_with_subtitles(
        &self,
        text: &str,
        speaker: Speaker,
    ) -> Result<Synthesis, Error> {
        let voice_id = self.voices.for_speaker(speaker);
        tracing::debug!(voice_id, "Requesting edge TTS");

        let request = TtsRequest {
            model: "edge-tts",
            text,
            stream: false,
            get_srt: true,
            voice_setting: VoiceSetting {
                voice_id,
                speed: 1.0,
                volume: 1.0,
                pitch: 0.0,
            },
            audio_setting: AudioSetting {
                format: &self.output_format,
                sample_rate: 48_000,
                bitrate: 128_000,
            },
        };

        let resp = self
            .client
            .post(self.api_url.clone())
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to reach TTS gateway"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            tracing::error!(status, message = %message, "TTS gateway returned an error");
            return Err(Error::TransientUpstream(format!(
                "TTS gateway returned {status}"
            )));
        }

        let body = resp.json::<TtsResponse>().await?;
        let audio = STANDARD
            .decode(body.audio.trim())
            .map_err(|_| Error::ParseError("TTS gateway returned invalid base64 audio"))?;
        if audio.is_empty() {
            return Err(Error::TransientUpstream("TTS gateway returned no audio".into()));
        }

        let subtitles = if body.srt.trim().is_empty() {
            estimate_srt(text)
        } else {
            body.srt
        };

        tracing::info!(size = audio.len(), "Synthesized speech");
        Ok(Synthesis { audio, subtitles })
    }
}

impl SpeechSynthesizer for EdgeTts {
    fn provider(&self) -> &'static str {
        "edge"
    }

    async fn synthesize(&self, text: &str, speaker: Speaker) -> Result<Vec<u8>, Error> {
        self.synthesize_with_subtitles(text, speaker)
            .await
            .map(|synthesis| synthesis.audio)
    }
}
