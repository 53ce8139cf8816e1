pub mod audio;
pub mod config;
mod error;
mod llm;
pub mod parser;
mod processor;
pub mod registry;
pub mod script;
pub mod source;
pub mod tracing;
pub mod tts;
pub mod types;

pub use error::Error;
pub use llm::openai;
pub use llm::{
    retry::{RetryPolicy, Retrying},
    PromptRole, TextGenerator,
};
pub use processor::{builder::DigestPipelineBuilder, Admission, DigestPipeline, RunOutcome};
pub use script::{parse_script, ScriptTurn, Speaker};
