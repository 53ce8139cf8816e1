use crate::llm::PromptRole;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network failure, timeout or non-success status from a collaborator
    #[error("Upstream request failed: {0}")]
    TransientUpstream(String),
    #[error("{role} generation failed after {attempts} attempt(s): {reason}")]
    TerminalGeneration {
        role: PromptRole,
        attempts: u32,
        reason: String,
    },
    #[error("Skipped {unit}: {reason}")]
    UnitSkipped { unit: String, reason: String },
    #[error("Audio merge failed: {0}")]
    Merge(String),
    #[error("Invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Unknown speaker label {0:?}")]
    UnknownSpeaker(String),
    #[error("Missing required setting {0}")]
    MissingSetting(&'static str),
    #[error("Parse error: {0}")]
    ParseError(&'static str),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        Error::TransientUpstream(err.to_string())
    }
}
