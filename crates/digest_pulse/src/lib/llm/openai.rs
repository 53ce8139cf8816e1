use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::Error,
    llm::{PromptRole, TextGenerator},
    types::cap_chars,
};

/// Client for any OpenAI compatible API (OpenAI, DeepSeek, ...).
/// Handles both chat completions and speech synthesis.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    speech_model: String,
}

impl OpenAIClient {
    const STORY_PROMPT: &str = include_str!("./prompts/story.txt");
    const PODCAST_PROMPT: &str = include_str!("./prompts/podcast.txt");
    const BLOG_PROMPT: &str = include_str!("./prompts/blog.txt");
    const INTRO_PROMPT: &str = include_str!("./prompts/intro.txt");

    /// Intros are short, they never need the full token budget
    const INTRO_MAX_TOKENS: u32 = 300;

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            max_tokens: 4096,
            speech_model: "tts-1".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_speech_model(mut self, model: impl Into<String>) -> Self {
        self.speech_model = model.into();
        self
    }

    fn system_prompt(role: PromptRole) -> &'static str {
        match role {
            PromptRole::Story => Self::STORY_PROMPT,
            PromptRole::Podcast => Self::PODCAST_PROMPT,
            PromptRole::Blog => Self::BLOG_PROMPT,
            PromptRole::Intro => Self::INTRO_PROMPT,
        }
    }

    pub async fn send_completion_request(
        &self,
        system_prompt: &str,
        user_content: &str,
        max_tokens: u32,
    ) -> Result<CompletionResponse, Error> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [
                {
                    "role": "system",
                    "content": system_prompt
                },
                {
                    "role": "user",
                    "content": user_content
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))
            .map_err(|e| Error::TransientUpstream(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(Error::TransientUpstream(format!(
                "completion API returned {status}: {message}"
            )));
        }

        Ok(resp.json::<CompletionResponse>().await?)
    }

    /// Synthesizes `text` with the given voice, returning MP3 bytes
    pub async fn send_speech_request(&self, text: &str, voice: &str) -> Result<Vec<u8>, Error> {
        let body = serde_json::json!({
            "model": self.speech_model,
            "input": text,
            "voice": voice,
            "response_format": "mp3"
        });

        let resp = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))
            .map_err(|e| Error::TransientUpstream(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(Error::TransientUpstream(format!(
                "speech API returned {status}: {message}"
            )));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub choices: Vec<CompletionChoice>,
    pub usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionUsage {
    pub total_tokens: u64,
}

impl TextGenerator for OpenAIClient {
    async fn generate(&self, role: PromptRole, payload: &str) -> Result<String, Error> {
        let (payload, max_tokens) = match role {
            // roughly four characters per token
            PromptRole::Story => (cap_chars(payload, self.max_tokens as usize * 4), self.max_tokens),
            PromptRole::Intro => (payload, Self::INTRO_MAX_TOKENS),
            PromptRole::Podcast | PromptRole::Blog => (payload, self.max_tokens),
        };

        tracing::debug!(model = %self.model, %role, "Requesting completion");
        let response = self
            .send_completion_request(Self::system_prompt(role), payload, max_tokens)
            .await
            .inspect_err(|e| tracing::error!(error = %e, %role, "Failed to generate content"))?;

        if let Some(usage) = &response.usage {
            tracing::info!(%role, total_tokens = usage.total_tokens, "Completion succeeded");
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| Error::TransientUpstream("No content in completion response".into()))
    }
}
