//! Command line and environment configuration.
//!
//! Each group is a `clap::Args` struct so the binary can flatten the ones it
//! needs; every flag also reads from the environment (and `.env`).

use std::{path::PathBuf, time::Duration};

use chrono_tz::Tz;
use clap::{Args, ValueEnum};
use digest_store::{AnyArtifactStore, LocalArtifactStore, PgArtifactStore};

use crate::{
    audio::FfmpegConcat,
    error::Error,
    llm::retry::RetryPolicy,
    openai::OpenAIClient,
    tts::{EdgeTts, OpenAISpeech, Synthesizer, Voices},
    types::ArtifactKeys,
};

fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>().map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Args)]
pub struct PipelineArgs {
    /// Deployment environment, part of every content key
    #[arg(long = "env", env = "WORKER_ENV", default_value = "production")]
    pub environment: String,

    /// Items to summarize per run
    #[arg(long, env = "MAX_ITEMS", default_value_t = 10)]
    pub max_items: usize,

    /// Pause between consecutive items in milliseconds
    #[arg(long, env = "STORY_PACING_MS", default_value_t = 2000)]
    pub pacing_ms: u64,

    /// Character cap applied to article and discussion text
    #[arg(long, env = "CONTENT_CHAR_CAP", default_value_t = 16384)]
    pub content_char_cap: usize,

    /// Timezone that decides which date "today" is
    #[arg(long, env = "DIGEST_TIMEZONE", default_value = "UTC", value_parser = parse_timezone)]
    pub timezone: Tz,
}

impl PipelineArgs {
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            keys: ArtifactKeys::new(&self.environment),
            max_items: self.max_items,
            pacing: Duration::from_millis(self.pacing_ms),
            content_char_cap: self.content_char_cap,
            timezone: self.timezone,
        }
    }
}

/// Runtime knobs of the pipeline itself
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub keys: ArtifactKeys,
    /// Used when a run asks for zero items
    pub max_items: usize,
    pub pacing: Duration,
    pub content_char_cap: usize,
    pub timezone: Tz,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            keys: ArtifactKeys::new("production"),
            max_items: 10,
            pacing: Duration::from_secs(2),
            content_char_cap: 16 * 1024,
            timezone: Tz::UTC,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct LlmArgs {
    /// Base URL of the OpenAI compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.deepseek.com/v1")]
    pub openai_base_url: String,

    /// Only required by commands that generate or narrate through OpenAI
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_MODEL", default_value = "deepseek-chat")]
    pub openai_model: String,

    #[arg(long, env = "OPENAI_MAX_TOKENS", default_value_t = 4096)]
    pub openai_max_tokens: u32,

    /// Attempts per generation call
    #[arg(long, env = "GENERATION_MAX_ATTEMPTS", default_value_t = 3)]
    pub generation_attempts: u32,

    /// Timeout of a single generation attempt in seconds
    #[arg(long, env = "GENERATION_TIMEOUT_SECS", default_value_t = 120)]
    pub generation_timeout_secs: u64,

    /// Base pause between attempts in seconds, multiplied by the attempt number
    #[arg(long, env = "GENERATION_RETRY_DELAY_SECS", default_value_t = 2)]
    pub generation_retry_delay_secs: u64,
}

impl LlmArgs {
    /// Client for commands that only read or delete stored artifacts; it is
    /// never asked to generate, so no key is needed.
    pub fn client(&self) -> OpenAIClient {
        OpenAIClient::new(self.openai_api_key.as_deref().unwrap_or_default())
            .with_base_url(&self.openai_base_url)
            .with_model(&self.openai_model)
            .with_max_tokens(self.openai_max_tokens)
    }

    pub fn authenticated_client(&self) -> Result<OpenAIClient, Error> {
        match self.openai_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(self.client()),
            _ => Err(Error::MissingSetting("OPENAI_API_KEY")),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.generation_attempts,
            attempt_timeout: Duration::from_secs(self.generation_timeout_secs),
            base_delay: Duration::from_secs(self.generation_retry_delay_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TtsProvider {
    Edge,
    Openai,
}

#[derive(Debug, Clone, Args)]
pub struct TtsArgs {
    #[arg(long, env = "TTS_PROVIDER", value_enum, default_value_t = TtsProvider::Edge)]
    pub tts_provider: TtsProvider,

    #[arg(long, env = "EDGE_TTS_API_URL", default_value = "http://localhost:5050/v1/t2a")]
    pub edge_tts_api_url: String,

    /// Audio format requested from the edge gateway
    #[arg(long, env = "EDGE_TTS_FORMAT", default_value = "mp3")]
    pub edge_tts_format: String,

    /// Voice for male turns, provider default when unset
    #[arg(long, env = "TTS_MALE_VOICE")]
    pub male_voice: Option<String>,

    /// Voice for female turns, provider default when unset
    #[arg(long, env = "TTS_FEMALE_VOICE")]
    pub female_voice: Option<String>,

    #[arg(long, env = "OPENAI_TTS_MODEL", default_value = "tts-1")]
    pub openai_tts_model: String,
}

impl TtsArgs {
    fn voices(&self, male: &str, female: &str) -> Voices {
        Voices::new(
            self.male_voice.as_deref().unwrap_or(male),
            self.female_voice.as_deref().unwrap_or(female),
        )
    }

    /// Builds the configured provider. The OpenAI provider reuses the
    /// generator's credentials and base URL.
    pub fn synthesizer(&self, llm: &OpenAIClient) -> Result<Synthesizer, Error> {
        let synthesizer = match self.tts_provider {
            TtsProvider::Edge => Synthesizer::Edge(EdgeTts::new(
                &self.edge_tts_api_url,
                &self.edge_tts_format,
                self.voices(EdgeTts::DEFAULT_MALE_VOICE, EdgeTts::DEFAULT_FEMALE_VOICE),
            )?),
            TtsProvider::Openai => Synthesizer::OpenAI(OpenAISpeech::new(
                llm.clone().with_speech_model(&self.openai_tts_model),
                self.voices(
                    OpenAISpeech::DEFAULT_MALE_VOICE,
                    OpenAISpeech::DEFAULT_FEMALE_VOICE,
                ),
            )),
        };
        Ok(synthesizer)
    }
}

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// Postgres connection URL; artifacts go to ARTIFACT_DIR when unset
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "ARTIFACT_DIR", default_value = "/var/tmp/digest-pulse/artifacts")]
    pub artifact_dir: PathBuf,

    /// Public URL prefix used to build artifact locators
    #[arg(long, env = "ARTIFACT_PUBLIC_BASE_URL")]
    pub artifact_public_base_url: Option<String>,
}

impl StoreArgs {
    pub async fn connect(&self) -> anyhow::Result<AnyArtifactStore> {
        let public_base_url = self.artifact_public_base_url.clone();

        let store = match &self.database_url {
            Some(url) => AnyArtifactStore::Postgres(PgArtifactStore::init(url, public_base_url).await?),
            None => {
                tracing::info!(root = %self.artifact_dir.display(), "Using filesystem artifact store");
                AnyArtifactStore::Local(LocalArtifactStore::new(&self.artifact_dir, public_base_url))
            }
        };
        Ok(store)
    }
}

#[derive(Debug, Clone, Args)]
pub struct MergeArgs {
    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    pub ffmpeg_path: PathBuf,
}

impl MergeArgs {
    pub fn merger(&self) -> FfmpegConcat {
        FfmpegConcat::new(&self.ffmpeg_path)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        pipeline: PipelineArgs,
        #[command(flatten)]
        llm: LlmArgs,
        #[command(flatten)]
        tts: TtsArgs,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "digest-pulse",
            "--env",
            "staging",
            "--max-items",
            "5",
            "--timezone",
            "Asia/Shanghai",
            "--openai-api-key",
            "sk-test",
            "--generation-attempts",
            "4",
            "--tts-provider",
            "openai",
            "--male-voice",
            "echo",
        ]);

        assert_eq!(cli.pipeline.environment, "staging");
        assert_eq!(cli.pipeline.max_items, 5);
        assert_eq!(cli.pipeline.timezone, chrono_tz::Asia::Shanghai);
        assert_eq!(cli.llm.retry_policy().max_attempts, 4);
        assert_eq!(cli.tts.tts_provider, TtsProvider::Openai);

        let voices = cli.tts.voices(OpenAISpeech::DEFAULT_MALE_VOICE, OpenAISpeech::DEFAULT_FEMALE_VOICE);
        assert_eq!(voices.male, "echo");
        assert_eq!(voices.female, OpenAISpeech::DEFAULT_FEMALE_VOICE);
    }

    #[test]
    fn test_api_key_only_required_when_authenticating() {
        let cli = TestCli::parse_from(["digest-pulse", "--openai-api-key", " "]);
        assert!(matches!(
            cli.llm.authenticated_client(),
            Err(Error::MissingSetting("OPENAI_API_KEY"))
        ));
        assert!(cli.tts.synthesizer(&cli.llm.client()).is_ok());

        let cli = TestCli::parse_from(["digest-pulse", "--openai-api-key", "sk-test"]);
        assert!(cli.llm.authenticated_client().is_ok());
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let result = TestCli::try_parse_from([
            "digest-pulse",
            "--timezone",
            "Mars/Olympus",
            "--openai-api-key",
            "sk-test",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_from_args() {
        let cli = TestCli::parse_from(["digest-pulse", "--openai-api-key", "sk-test", "--pacing-ms", "0"]);
        let settings = cli.pipeline.settings();

        assert_eq!(settings.pacing, Duration::ZERO);
        assert_eq!(settings.content_char_cap, 16384);
        assert_eq!(settings.timezone, Tz::UTC);
    }
}
