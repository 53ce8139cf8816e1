pub mod openai;
pub mod retry;

use std::{fmt, future::Future};

use crate::error::Error;

/// Which derivative text a generation call produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptRole {
    /// Summary of a single story from its article and discussion
    Story,
    /// Two-host dialogue script from all story summaries
    Podcast,
    /// Long-form blog post from all story summaries
    Blog,
    /// Short intro from the podcast script
    Intro,
}

impl fmt::Display for PromptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PromptRole::Story => "story summary",
            PromptRole::Podcast => "podcast script",
            PromptRole::Blog => "blog post",
            PromptRole::Intro => "intro",
        };
        f.write_str(name)
    }
}

pub trait TextGenerator {
    fn generate(
        &self,
        role: PromptRole,
        payload: &str,
    ) -> impl Future<Output = Result<String, Error>> + Send;
}
